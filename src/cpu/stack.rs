//! Three-level subroutine address stack.
//!
//! The 4004 keeps return addresses on chip. Unlike the silicon, which
//! silently overwrites the oldest level, this model treats a fourth push and
//! an empty pop as fatal so that runaway call chains are caught.

use crate::cpu::memory::SnapshotError;
use crate::nibble::Addr12;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of return-address levels.
pub const STACK_DEPTH: usize = 3;

/// Fixed-capacity return-address stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StackLevels")]
pub struct CallStack {
    levels: [Addr12; STACK_DEPTH],
    depth: u8,
}

#[derive(Deserialize)]
struct StackLevels {
    levels: [Addr12; STACK_DEPTH],
    depth: u8,
}

impl TryFrom<StackLevels> for CallStack {
    type Error = SnapshotError;

    fn try_from(raw: StackLevels) -> Result<Self, SnapshotError> {
        if usize::from(raw.depth) > STACK_DEPTH {
            return Err(SnapshotError::Field {
                field: "stack depth",
                value: usize::from(raw.depth),
                limit: STACK_DEPTH,
            });
        }
        Ok(Self { levels: raw.levels, depth: raw.depth })
    }
}

impl CallStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a return address.
    ///
    /// The stack is left untouched on overflow.
    pub fn push(&mut self, addr: Addr12) -> Result<(), StackError> {
        let depth = usize::from(self.depth);
        if depth >= STACK_DEPTH {
            return Err(StackError::Overflow { addr });
        }
        self.levels[depth] = addr;
        self.depth += 1;
        Ok(())
    }

    /// Pop the most recent return address.
    pub fn pop(&mut self) -> Result<Addr12, StackError> {
        if self.depth == 0 {
            return Err(StackError::Underflow);
        }
        self.depth -= 1;
        Ok(self.levels[usize::from(self.depth)])
    }

    /// Number of occupied levels (0-3).
    #[inline]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// True when no further push is possible.
    #[inline]
    pub fn is_full(&self) -> bool {
        usize::from(self.depth) == STACK_DEPTH
    }

    /// Occupied levels, oldest first.
    pub fn frames(&self) -> &[Addr12] {
        &self.levels[..usize::from(self.depth)]
    }

    /// Drop all levels.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Errors raised by stack discipline violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("call stack overflow pushing return address {addr}")]
    Overflow { addr: Addr12 },

    #[error("call stack underflow on return")]
    Underflow,
}
