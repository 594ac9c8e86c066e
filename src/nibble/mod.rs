//! 4-bit and 12-bit machine values.
//!
//! This module provides the core value types of the MCS-4 family:
//! - [`Nibble`] - A 4-bit value (registers, accumulator, data RAM characters)
//! - [`Addr12`] - A 12-bit program address (program counter, stack levels)
//! - [`alu`] - Carry-aware 4-bit arithmetic used by the instruction set

mod value;
pub mod alu;

pub use value::{Nibble, Addr12, RangeError};
pub use alu::{add, subtract};
