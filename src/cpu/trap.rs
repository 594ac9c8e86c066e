//! Host trap hook on a reserved subroutine address.
//!
//! A `JMS` to [`TRAP_VECTOR`] is an ordinary subroutine call unless the host
//! runs the CPU with a [`TrapHandler`]. The handler then sees the CPU with
//! the PC already pointing past the `JMS` and decides what happens next.

use crate::cpu::Cpu;
use crate::nibble::Addr12;

/// Reserved `JMS` target intercepted by an installed trap handler.
pub const TRAP_VECTOR: Addr12 = Addr12::new(0xFFF);

/// What the CPU does after a trap handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapAction {
    /// Perform the subroutine call as if no handler were installed.
    Call,
    /// Skip the call and continue at the current PC.
    Resume,
    /// Stop with [`HaltReason::Trap`](crate::cpu::HaltReason::Trap).
    Halt,
}

/// Host-side interceptor for `JMS` to [`TRAP_VECTOR`].
pub trait TrapHandler {
    /// Handle a trap. `cpu.regs.pc` is the return address of the `JMS`.
    fn on_trap(&mut self, cpu: &mut Cpu) -> TrapAction;
}

/// Stops the run on every trap.
#[derive(Debug, Default, Clone, Copy)]
pub struct HaltTrap;

impl TrapHandler for HaltTrap {
    fn on_trap(&mut self, _cpu: &mut Cpu) -> TrapAction {
        TrapAction::Halt
    }
}

/// Console service calls with inline arguments.
///
/// The word after the `JMS` selects the service; its arguments follow it
/// and are skipped before execution resumes:
///
/// ```text
/// JMS 0xFFF / DB 0          halt
/// JMS 0xFFF / DB 1, 'X'     emit the character 'X'
/// JMS 0xFFF / DB 2, n       emit register Rn as a hex digit
/// ```
///
/// Unknown service codes halt.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsoleTrap {
    /// Characters emitted so far.
    pub output: String,
}

impl ConsoleTrap {
    /// Service: halt.
    pub const HALT: u8 = 0;
    /// Service: emit an inline character.
    pub const SAY: u8 = 1;
    /// Service: emit a register as a hex digit.
    pub const PUTN: u8 = 2;

    /// Create an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    fn inline_word(cpu: &mut Cpu) -> u8 {
        let pc = cpu.regs.advance_pc();
        cpu.rom.read(pc)
    }
}

impl TrapHandler for ConsoleTrap {
    fn on_trap(&mut self, cpu: &mut Cpu) -> TrapAction {
        match Self::inline_word(cpu) {
            Self::SAY => {
                let ch = Self::inline_word(cpu);
                self.output.push(char::from(ch));
                TrapAction::Resume
            }
            Self::PUTN => {
                let reg = Self::inline_word(cpu);
                let value = cpu.regs.reg(reg).value();
                self.output.push_str(&format!("{value:X}"));
                TrapAction::Resume
            }
            service => {
                if service != Self::HALT {
                    tracing::warn!(service, "unknown console service, halting");
                }
                TrapAction::Halt
            }
        }
    }
}
