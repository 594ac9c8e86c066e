//! # i4004 Emulator
//!
//! An instruction-level emulator of the Intel 4004 (1971) microprocessor.
//!
//! The 4004 was the first commercial single-chip CPU: a 4-bit machine with
//! 4096 words of program memory, 16 index registers and a three-level
//! on-chip return stack. This crate models its programmer-visible state,
//! executes programs to completion, and ships an assembler and
//! disassembler for working with program images.
//!
//! ```
//! use i4004::{assemble, Cpu, HaltReason};
//!
//! let program = assemble("LDM 5\nHLT").unwrap();
//! let mut cpu = Cpu::new();
//! cpu.load_program(&program.bytes).unwrap();
//! let report = cpu.run().unwrap();
//! assert_eq!(report.accumulator.value(), 5);
//! assert_eq!(report.reason, HaltReason::Instruction);
//! ```

pub mod nibble;
pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use nibble::{Addr12, Nibble, RangeError};
pub use cpu::{
    ConsoleTrap, Cpu, CpuError, CpuState, HaltReason, HaltReport, HaltTrap, Hooks, Instruction,
    RunOutcome, SnapshotError, TraceEntry, TraceSink, TrapAction, TrapHandler, TRAP_VECTOR,
};
pub use asm::{assemble, disassemble, Assembly, AssemblerError, LoadError, ProgramImage};
pub use config::{ConfigError, RunConfig, TrapMode};
