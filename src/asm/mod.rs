//! Assembler, disassembler and program images for 4004 programs.
//!
//! This module provides:
//! - A two-pass assembler (text → binary image)
//! - A disassembler (binary → readable text)
//! - The binary image loader with a hex dump view

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, Assembly, AssemblerError};
pub use disasm::{disassemble, disassemble_at, format_instruction};
pub use image::{LoadError, ProgramImage};
