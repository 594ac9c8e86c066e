//! CPU emulation for the Intel 4004.
//!
//! This module implements the 4004 programmer's model:
//! - 4096 words of program memory and banked 4002 data RAM
//! - 16 index registers, a 4-bit accumulator and a carry flag
//! - a three-level return-address stack
//! - the 46-instruction MCS-4 set plus `HLT` and `WPM`

pub mod memory;
pub mod registers;
pub mod stack;
pub mod decode;
pub mod execute;
pub mod trap;
pub mod trace;

pub use memory::{DataMemory, ProgramMemory, SnapshotError};
pub use registers::Registers;
pub use stack::{CallStack, StackError};
pub use decode::{decode, encode, Condition, Instruction};
pub use execute::{Cpu, CpuError, CpuState, HaltReason, HaltReport, Hooks, RunOutcome};
pub use trap::{ConsoleTrap, HaltTrap, TrapAction, TrapHandler, TRAP_VECTOR};
pub use trace::{LogTrace, TraceEntry, TraceSink};
