//! Per-instruction execution trace.

use crate::asm::disasm::format_instruction;
use crate::cpu::decode::Instruction;
use crate::nibble::{Addr12, Nibble};
use serde::{Serialize, Deserialize};

/// One retired instruction and the flags it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Step number, starting at 0 for the first retired instruction.
    pub step: u64,
    /// Address the instruction was fetched from.
    pub pc: Addr12,
    /// The decoded instruction.
    pub instruction: Instruction,
    /// Accumulator after execution.
    pub acc: Nibble,
    /// Carry after execution.
    pub carry: bool,
    /// Call stack depth after execution.
    pub depth: u8,
}

/// Receives trace entries in execution order.
pub trait TraceSink {
    /// Record one retired instruction.
    fn record(&mut self, entry: &TraceEntry);
}

impl TraceSink for Vec<TraceEntry> {
    fn record(&mut self, entry: &TraceEntry) {
        self.push(entry.clone());
    }
}

/// Forwards every entry to `tracing` at INFO level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, entry: &TraceEntry) {
        tracing::info!(
            step = entry.step,
            "{}: {:<14} A={} CY={} SP={}",
            entry.pc,
            format_instruction(&entry.instruction),
            entry.acc,
            u8::from(entry.carry),
            entry.depth,
        );
    }
}
