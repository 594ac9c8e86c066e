//! CPU execution engine for the 4004.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::asm::image::{LoadError, ProgramImage};
use crate::cpu::decode::{decode, Instruction};
use crate::cpu::stack::{CallStack, StackError};
use crate::cpu::trace::{TraceEntry, TraceSink};
use crate::cpu::trap::{TrapAction, TrapHandler, TRAP_VECTOR};
use crate::cpu::{DataMemory, ProgramMemory, Registers};
use crate::nibble::{alu, Addr12, Nibble};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The TEST input is not wired to anything and reads high.
const TEST_PIN_LOW: bool = false;

/// Why the CPU stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaltReason {
    /// Executed `HLT`.
    Instruction,
    /// `JMS` with all three stack levels in use.
    StackOverflow,
    /// `BBL` with an empty stack.
    StackUnderflow,
    /// A trap handler requested the stop.
    Trap,
}

impl HaltReason {
    /// True for control faults, false for requested stops.
    pub fn is_fatal(self) -> bool {
        matches!(self, HaltReason::StackOverflow | HaltReason::StackUnderflow)
    }

    /// Numeric reason code reported to hosts.
    pub fn code(self) -> u8 {
        match self {
            HaltReason::Instruction => 0,
            HaltReason::StackOverflow => 1,
            HaltReason::StackUnderflow => 2,
            HaltReason::Trap => 3,
        }
    }
}

impl From<StackError> for HaltReason {
    fn from(e: StackError) -> Self {
        match e {
            StackError::Overflow { .. } => HaltReason::StackOverflow,
            StackError::Underflow => HaltReason::StackUnderflow,
        }
    }
}

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is fetching and executing.
    Running,
    /// CPU has stopped and will not fetch again until reset.
    Halted(HaltReason),
}

/// Final state handed back to the host when a run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltReport {
    /// Why execution stopped.
    pub reason: HaltReason,
    /// Accumulator at the moment of the halt.
    pub accumulator: Nibble,
    /// Carry at the moment of the halt.
    pub carry: bool,
    /// PC at the halt. For faults this is the address of the faulting
    /// instruction; otherwise the next address that would be fetched.
    pub pc: Addr12,
    /// Instructions retired since reset.
    pub steps: u64,
}

/// Result of a run that may be cut short by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The CPU halted.
    Halted(HaltReport),
    /// The host's step budget ran out while the CPU was still running.
    StepLimit {
        /// Instructions retired during this call.
        steps: u64,
    },
}

/// Optional host hooks consulted while stepping.
#[derive(Default)]
pub struct Hooks<'a> {
    /// Interceptor for `JMS` to the trap vector.
    pub trap: Option<&'a mut dyn TrapHandler>,
    /// Receiver for per-instruction trace entries.
    pub trace: Option<&'a mut dyn TraceSink>,
}

impl<'a> Hooks<'a> {
    /// Install a trap handler.
    pub fn with_trap(mut self, trap: &'a mut dyn TrapHandler) -> Self {
        self.trap = Some(trap);
        self
    }

    /// Install a trace sink.
    pub fn with_trace(mut self, trace: &'a mut dyn TraceSink) -> Self {
        self.trace = Some(trace);
        self
    }
}

/// The 4004 CPU with its program and data memory.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Subroutine return stack.
    pub stack: CallStack,
    /// Program memory.
    pub rom: ProgramMemory,
    /// Data RAM, bank select and address latch.
    pub ram: DataMemory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions retired since reset.
    pub steps: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and `NOP`-filled program memory.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            stack: CallStack::new(),
            rom: ProgramMemory::new(),
            ram: DataMemory::new(),
            state: CpuState::Running,
            steps: 0,
            last_instr: None,
        }
    }

    /// Create a CPU with `image` loaded.
    pub fn with_image(image: &ProgramImage) -> Self {
        let mut cpu = Self::new();
        cpu.load_image(image);
        cpu
    }

    /// Reset to the power-on baseline.
    ///
    /// Registers, stack, data RAM and counters are cleared. Program memory
    /// is kept, as ROM would be.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.stack.clear();
        self.ram.clear();
        self.state = CpuState::Running;
        self.steps = 0;
        self.last_instr = None;
    }

    /// Load a validated image into program memory.
    pub fn load_image(&mut self, image: &ProgramImage) {
        self.rom.load_image(image);
    }

    /// Load raw bytes into program memory starting at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.rom.load_program(program)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        self.step_with(&mut Hooks::default())
    }

    /// Execute a single instruction with host hooks.
    ///
    /// On a control fault nothing of the instruction is applied: the PC is
    /// left on the faulting instruction and the CPU enters
    /// [`CpuState::Halted`] with the matching reason.
    pub fn step_with(&mut self, hooks: &mut Hooks<'_>) -> Result<Instruction, CpuError> {
        if let CpuState::Halted(reason) = self.state {
            return Err(CpuError::NotRunning(reason));
        }

        // Fetch
        let pc = self.regs.advance_pc();
        let first = self.rom.read(pc);
        let second = if Instruction::word_count(first) == 2 {
            let operand = self.regs.advance_pc();
            self.rom.read(operand)
        } else {
            0
        };

        // Decode + execute
        let instr = decode(first, second);
        if let Err(source) = self.execute(instr, hooks) {
            let reason = HaltReason::from(source);
            self.regs.pc = pc;
            self.state = CpuState::Halted(reason);
            tracing::warn!(%pc, ?reason, "control fault, halting");
            return Err(CpuError::Fault { pc, source });
        }

        // Update state
        let step = self.steps;
        self.steps += 1;
        self.last_instr = Some(instr);

        tracing::trace!(step, %pc, ?instr, acc = self.regs.acc.value(), carry = self.regs.carry, "retired");
        if let Some(sink) = hooks.trace.as_mut() {
            sink.record(&TraceEntry {
                step,
                pc,
                instruction: instr,
                acc: self.regs.acc,
                carry: self.regs.carry,
                depth: self.stack.depth(),
            });
        }
        if let CpuState::Halted(reason) = self.state {
            tracing::debug!(?reason, acc = self.regs.acc.value(), steps = self.steps, "halted");
        }

        Ok(instr)
    }

    /// Run until the CPU halts.
    ///
    /// There is no internal step limit; a program that never halts keeps
    /// running. Control faults end the run and are reported in the
    /// returned [`HaltReport`].
    pub fn run(&mut self) -> Result<HaltReport, CpuError> {
        let mut hooks = Hooks::default();
        loop {
            if let Some(report) = self.halt_report() {
                return Ok(report);
            }
            self.retire(&mut hooks)?;
        }
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<RunOutcome, CpuError> {
        self.run_with(&mut Hooks::default(), Some(max_steps))
    }

    /// Run with host hooks and an optional step budget.
    pub fn run_with(&mut self, hooks: &mut Hooks<'_>, limit: Option<u64>) -> Result<RunOutcome, CpuError> {
        let start = self.steps;
        loop {
            if let Some(report) = self.halt_report() {
                return Ok(RunOutcome::Halted(report));
            }
            let taken = self.steps - start;
            if limit.is_some_and(|max| taken >= max) {
                return Ok(RunOutcome::StepLimit { steps: taken });
            }
            self.retire(hooks)?;
        }
    }

    /// Step once, folding control faults into the halted state.
    fn retire(&mut self, hooks: &mut Hooks<'_>) -> Result<(), CpuError> {
        match self.step_with(hooks) {
            Ok(_) | Err(CpuError::Fault { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Execute a decoded instruction.
    ///
    /// The PC already points past the instruction's last word.
    fn execute(&mut self, instr: Instruction, hooks: &mut Hooks<'_>) -> Result<(), StackError> {
        let acc = self.regs.acc;
        let carry = self.regs.carry;

        match instr {
            // ==================== Family 0 ====================

            Instruction::Nop | Instruction::Undefined { .. } => {}

            Instruction::Hlt => {
                self.state = CpuState::Halted(HaltReason::Instruction);
            }

            // ==================== Control Flow ====================

            Instruction::Jcn { cond, target } => {
                if cond.holds(acc, carry, TEST_PIN_LOW) {
                    self.regs.jump_in_page(target);
                }
            }

            Instruction::Jun { target } => {
                self.regs.jump(target);
            }

            Instruction::Jms { target } => {
                if target == TRAP_VECTOR {
                    if let Some(handler) = hooks.trap.as_mut() {
                        // A call with no free level must leave no trace of the handler.
                        let saved = self.stack.is_full().then(|| self.clone());
                        match handler.on_trap(self) {
                            TrapAction::Call => {
                                if let Some(saved) = saved {
                                    *self = saved;
                                    return Err(StackError::Overflow { addr: self.regs.pc });
                                }
                            }
                            TrapAction::Resume => return Ok(()),
                            TrapAction::Halt => {
                                self.state = CpuState::Halted(HaltReason::Trap);
                                return Ok(());
                            }
                        }
                    }
                }
                self.stack.push(self.regs.pc)?;
                self.regs.jump(target);
            }

            Instruction::Bbl { data } => {
                let ret = self.stack.pop()?;
                self.regs.jump(ret);
                self.regs.acc = data;
            }

            Instruction::Jin { pair } => {
                let low = self.regs.pair(pair);
                self.regs.jump_in_page(low);
            }

            Instruction::Isz { reg, target } => {
                let (value, _) = alu::increment(self.regs.reg(reg));
                self.regs.set_reg(reg, value);
                if !value.is_zero() {
                    self.regs.jump_in_page(target);
                }
            }

            // ==================== Register Transfer ====================

            Instruction::Fim { pair, data } => {
                self.regs.set_pair(pair, data);
            }

            Instruction::Fin { pair } => {
                let byte = self.rom.fetch_indirect(self.regs.pc, self.regs.pair(0));
                self.regs.set_pair(pair, byte);
            }

            Instruction::Src { pair } => {
                self.ram.latch_address(self.regs.pair(pair));
            }

            Instruction::Ld { reg } => {
                self.regs.acc = self.regs.reg(reg);
            }

            Instruction::Xch { reg } => {
                let r = self.regs.reg(reg);
                self.regs.set_reg(reg, acc);
                self.regs.acc = r;
            }

            Instruction::Ldm { data } => {
                self.regs.acc = data;
            }

            Instruction::Inc { reg } => {
                let (value, _) = alu::increment(self.regs.reg(reg));
                self.regs.set_reg(reg, value);
            }

            // ==================== Arithmetic ====================

            Instruction::Add { reg } => {
                self.set_acc_carry(alu::add(acc, self.regs.reg(reg), carry));
            }

            Instruction::Sub { reg } => {
                self.set_acc_carry(alu::subtract(acc, self.regs.reg(reg), carry));
            }

            Instruction::Adm => {
                self.set_acc_carry(alu::add(acc, self.ram.read_nibble(), carry));
            }

            Instruction::Sbm => {
                self.set_acc_carry(alu::subtract(acc, self.ram.read_nibble(), carry));
            }

            // ==================== RAM and I/O ====================

            Instruction::Wrm => self.ram.write_nibble(acc),
            Instruction::Wmp => self.ram.write_output_port(acc),
            Instruction::Wrr => self.ram.write_rom_port(acc),
            Instruction::Wr { index } => self.ram.write_status(index, acc),
            Instruction::Rdm => self.regs.acc = self.ram.read_nibble(),
            Instruction::Rdr => self.regs.acc = self.ram.read_rom_port(),
            Instruction::Rd { index } => self.regs.acc = self.ram.read_status(index),

            Instruction::Wpm => {
                let (addr, high) = self.ram.next_program_write();
                self.rom.promote_nibble(addr, high, acc);
            }

            Instruction::Dcl => self.ram.select_bank(acc),

            // ==================== Accumulator Group ====================

            Instruction::Clb => self.set_acc_carry((Nibble::ZERO, false)),
            Instruction::Clc => self.regs.carry = false,
            Instruction::Stc => self.regs.carry = true,
            Instruction::Cmc => self.regs.carry = !carry,
            Instruction::Cma => self.regs.acc = alu::complement(acc),
            Instruction::Iac => self.set_acc_carry(alu::increment(acc)),
            Instruction::Dac => self.set_acc_carry(alu::decrement(acc)),
            Instruction::Ral => self.set_acc_carry(alu::rotate_left(acc, carry)),
            Instruction::Rar => self.set_acc_carry(alu::rotate_right(acc, carry)),
            Instruction::Tcc => self.set_acc_carry((Nibble::new(u8::from(carry)), false)),
            Instruction::Tcs => self.set_acc_carry((alu::transfer_carry_subtract(carry), false)),
            Instruction::Daa => self.set_acc_carry(alu::decimal_adjust(acc, carry)),
            Instruction::Kbp => self.regs.acc = alu::keyboard_process(acc),
        }

        Ok(())
    }

    #[inline]
    fn set_acc_carry(&mut self, (acc, carry): (Nibble, bool)) {
        self.regs.acc = acc;
        self.regs.carry = carry;
    }

    /// Report for a halted CPU, `None` while running.
    pub fn halt_report(&self) -> Option<HaltReport> {
        match self.state {
            CpuState::Running => None,
            CpuState::Halted(reason) => Some(HaltReport {
                reason,
                accumulator: self.regs.acc,
                carry: self.regs.carry,
                pc: self.regs.pc,
                steps: self.steps,
            }),
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        matches!(self.state, CpuState::Halted(_))
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .field("stack", &self.stack)
            .field("ram", &self.ram)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: halted ({0:?})")]
    NotRunning(HaltReason),

    #[error("control fault at PC={pc}: {source}")]
    Fault { pc: Addr12, source: StackError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, Condition};
    use crate::cpu::trap::{ConsoleTrap, HaltTrap};

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        instructions.iter().flat_map(encode).collect()
    }

    fn run_program(instructions: &[Instruction]) -> (Cpu, HaltReport) {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(instructions)).unwrap();
        let report = cpu.run().unwrap();
        (cpu, report)
    }

    fn n(v: u8) -> Nibble {
        Nibble::new(v)
    }

    #[test]
    fn test_cpu_halt() {
        let (cpu, report) = run_program(&[Instruction::Hlt]);

        assert_eq!(report.steps, 1);
        assert_eq!(report.reason, HaltReason::Instruction);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_ldm_then_halt_reports_accumulator() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xD5, 0x01]).unwrap();

        let report = cpu.run().unwrap();
        assert_eq!(report.accumulator, n(5));
        assert_eq!(report.reason, HaltReason::Instruction);
        assert_eq!(report.pc.value(), 2);
    }

    #[test]
    fn test_step_after_halt_is_rejected() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0x01]).unwrap();
        cpu.step().unwrap();

        assert_eq!(cpu.step(), Err(CpuError::NotRunning(HaltReason::Instruction)));
    }

    #[test]
    fn test_nops_then_halt() {
        let (_, report) = run_program(&[
            Instruction::Nop,
            Instruction::Undefined { opcode: 0x0F },
            Instruction::Undefined { opcode: 0xFE },
            Instruction::Hlt,
        ]);
        assert_eq!(report.steps, 4);
    }

    #[test]
    fn test_add_with_carry_chain() {
        let (cpu, _) = run_program(&[
            Instruction::Fim { pair: 0, data: 0x9C },
            Instruction::Ldm { data: n(7) },
            Instruction::Add { reg: 1 }, // 7 + 12 = 19 -> 3, CY
            Instruction::Add { reg: 0 }, // 3 + 9 + 1 = 13
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.acc, n(13));
        assert!(!cpu.regs.carry);
    }

    #[test]
    fn test_sub_borrow_clears_carry() {
        let (cpu, _) = run_program(&[
            Instruction::Ldm { data: n(5) },
            Instruction::Xch { reg: 2 },
            Instruction::Ldm { data: n(3) },
            Instruction::Clc,
            Instruction::Sub { reg: 2 },
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.acc, n(14));
        assert!(!cpu.regs.carry);
    }

    #[test]
    fn test_jun_jumps_across_pages() {
        let mut program = make_program(&[Instruction::Jun { target: Addr12::new(0x345) }]);
        program.resize(0x345, 0);
        program.extend(make_program(&[Instruction::Ldm { data: n(9) }, Instruction::Hlt]));

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let report = cpu.run().unwrap();
        assert_eq!(report.accumulator, n(9));
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn test_jcn_consumes_second_word_either_way() {
        for (acc, taken) in [(0u8, true), (1u8, false)] {
            let mut cpu = Cpu::new();
            let program = make_program(&[
                Instruction::Ldm { data: n(acc) },
                Instruction::Jcn { cond: Condition::new(Condition::ACC_ZERO), target: 0x10 },
            ]);
            cpu.load_program(&program).unwrap();
            cpu.step().unwrap();
            cpu.step().unwrap();

            let expected = if taken { 0x10 } else { 0x03 };
            assert_eq!(cpu.regs.pc.value(), expected, "acc={acc}");
        }
    }

    #[test]
    fn test_jcn_target_uses_page_of_following_instruction() {
        // JCN occupying 0x1FE-0x1FF: the next address is 0x200, so the
        // jump lands in page 2.
        let mut program = vec![0u8; 0x1FE];
        program[0] = 0x41; // JUN 1FE
        program[1] = 0xFE;
        program.extend([0x18, 0x40]); // JCN always, 40
        program.resize(0x241, 0);
        program[0x240] = 0x01;

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let report = cpu.run().unwrap();
        assert_eq!(report.pc.value(), 0x241);
    }

    #[test]
    fn test_three_calls_then_overflow() {
        // Each subroutine calls the next; the fourth JMS overflows.
        let mut program = make_program(&[Instruction::Jms { target: Addr12::new(0x010) }]);
        program.resize(0x010, 0);
        program.extend(make_program(&[Instruction::Jms { target: Addr12::new(0x020) }]));
        program.resize(0x020, 0);
        program.extend(make_program(&[Instruction::Jms { target: Addr12::new(0x030) }]));
        program.resize(0x030, 0);
        program.extend(make_program(&[Instruction::Jms { target: Addr12::new(0x040) }]));

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let report = cpu.run().unwrap();

        assert_eq!(report.reason, HaltReason::StackOverflow);
        assert!(report.reason.is_fatal());
        assert_eq!(report.pc.value(), 0x030);
        assert_eq!(cpu.stack.depth(), 3);
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn test_step_reports_fault_once() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xC0]).unwrap();

        let err = cpu.step().unwrap_err();
        assert_eq!(err, CpuError::Fault { pc: Addr12::ZERO, source: StackError::Underflow });
        assert_eq!(cpu.state, CpuState::Halted(HaltReason::StackUnderflow));
        assert_eq!(cpu.step(), Err(CpuError::NotRunning(HaltReason::StackUnderflow)));
    }

    #[test]
    fn test_bbl_underflow_leaves_accumulator() {
        let (cpu, report) = run_program(&[
            Instruction::Ldm { data: n(6) },
            Instruction::Bbl { data: n(2) },
        ]);
        assert_eq!(report.reason, HaltReason::StackUnderflow);
        assert_eq!(report.accumulator, n(6));
        assert_eq!(report.pc.value(), 1);
        assert_eq!(cpu.stack.depth(), 0);
    }

    #[test]
    fn test_jms_bbl_returns_value() {
        let mut program = make_program(&[
            Instruction::Jms { target: Addr12::new(0x020) },
            Instruction::Hlt,
        ]);
        program.resize(0x020, 0);
        program.extend(make_program(&[Instruction::Bbl { data: n(11) }]));

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let report = cpu.run().unwrap();
        assert_eq!(report.accumulator, n(11));
        assert_eq!(report.pc.value(), 3);
        assert_eq!(cpu.stack.depth(), 0);
    }

    #[test]
    fn test_isz_loop_counts_to_zero() {
        // R0 = 13; loop: INC R1 / ISZ R0, loop  -> runs 3 times.
        let program = make_program(&[
            Instruction::Fim { pair: 0, data: 0xD0 },
            Instruction::Inc { reg: 1 },
            Instruction::Isz { reg: 0, target: 0x02 },
            Instruction::Hlt,
        ]);
        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        cpu.run().unwrap();

        assert_eq!(cpu.regs.reg(0), n(0));
        assert_eq!(cpu.regs.reg(1), n(3));
    }

    #[test]
    fn test_fin_reads_table_in_current_page() {
        let mut program = make_program(&[
            Instruction::Fim { pair: 0, data: 0x80 },
            Instruction::Fin { pair: 2 },
            Instruction::Hlt,
        ]);
        program.resize(0x81, 0);
        program[0x80] = 0x6B;

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.regs.pair(2), 0x6B);
    }

    #[test]
    fn test_jin_jumps_within_page() {
        let mut program = make_program(&[
            Instruction::Fim { pair: 1, data: 0x40 },
            Instruction::Jin { pair: 1 },
        ]);
        program.resize(0x41, 0);
        program[0x40] = 0x01;

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let report = cpu.run().unwrap();
        assert_eq!(report.pc.value(), 0x41);
    }

    #[test]
    fn test_ram_round_trip_survives_bank_switch() {
        let (cpu, _) = run_program(&[
            Instruction::Fim { pair: 1, data: 0x2A },
            Instruction::Src { pair: 1 },
            Instruction::Ldm { data: n(9) },
            Instruction::Wrm,
            Instruction::Ldm { data: n(4) },
            Instruction::Dcl,
            Instruction::Ldm { data: n(3) },
            Instruction::Wrm,
            Instruction::Clb,
            Instruction::Dcl,
            Instruction::Inc { reg: 5 },
            Instruction::Rdm,
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.acc, n(9));
        assert_eq!(cpu.ram.peek(4, 0x2A), n(3));
    }

    #[test]
    fn test_adm_sbm() {
        let (cpu, _) = run_program(&[
            Instruction::Src { pair: 0 },
            Instruction::Ldm { data: n(6) },
            Instruction::Wrm,
            Instruction::Ldm { data: n(4) },
            Instruction::Clc,
            Instruction::Sbm, // 4 - 6 -> 14, borrow
            Instruction::Xch { reg: 8 },
            Instruction::Ldm { data: n(12) },
            Instruction::Stc,
            Instruction::Adm, // 12 + 6 + 1 = 19 -> 3, CY
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.reg(8), n(14));
        assert_eq!(cpu.regs.acc, n(3));
        assert!(cpu.regs.carry);
    }

    #[test]
    fn test_status_and_ports() {
        let (cpu, _) = run_program(&[
            Instruction::Fim { pair: 0, data: 0x50 },
            Instruction::Src { pair: 0 },
            Instruction::Ldm { data: n(7) },
            Instruction::Wr { index: 2 },
            Instruction::Wmp,
            Instruction::Wrr,
            Instruction::Clb,
            Instruction::Rd { index: 2 },
            Instruction::Xch { reg: 4 },
            Instruction::Rdr,
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.reg(4), n(7));
        assert_eq!(cpu.regs.acc, n(7));
        assert_eq!(cpu.ram.output_port(0, 1), n(7));
    }

    #[test]
    fn test_wpm_patches_program_memory() {
        // Page from ROM port 14, offset 0x20 from the latch. Two WPMs write
        // 0xD7 (LDM 7) at 0x020, which is then executed.
        let program = make_program(&[
            Instruction::Fim { pair: 0, data: 0xE0 },
            Instruction::Src { pair: 0 },
            Instruction::Ldm { data: n(0) },
            Instruction::Wrr,
            Instruction::Fim { pair: 0, data: 0x20 },
            Instruction::Src { pair: 0 },
            Instruction::Ldm { data: n(0xD) },
            Instruction::Wpm,
            Instruction::Ldm { data: n(0x7) },
            Instruction::Wpm,
            Instruction::Jun { target: Addr12::new(0x020) },
        ]);
        let mut image = program;
        image.resize(0x22, 0);
        image[0x21] = 0x01;

        let mut cpu = Cpu::new();
        cpu.load_program(&image).unwrap();
        let report = cpu.run().unwrap();
        assert_eq!(cpu.rom.read(Addr12::new(0x020)), 0xD7);
        assert_eq!(report.accumulator, n(7));
    }

    #[test]
    fn test_accumulator_group() {
        let (cpu, _) = run_program(&[
            Instruction::Ldm { data: n(0b1010) },
            Instruction::Ral, // 0100, CY=1
            Instruction::Rar, // 1010, CY=0
            Instruction::Cma, // 0101
            Instruction::Iac, // 0110
            Instruction::Dac, // 0101, CY=1
            Instruction::Tcc, // A=1, CY=0
            Instruction::Xch { reg: 0 },
            Instruction::Stc,
            Instruction::Tcs, // A=10, CY=0
            Instruction::Xch { reg: 1 },
            Instruction::Ldm { data: n(8) },
            Instruction::Kbp, // 4
            Instruction::Xch { reg: 2 },
            Instruction::Ldm { data: n(0xB) },
            Instruction::Daa, // 11 + 6 = 17 -> 1, CY
            Instruction::Hlt,
        ]);
        assert_eq!(cpu.regs.reg(0), n(1));
        assert_eq!(cpu.regs.reg(1), n(10));
        assert_eq!(cpu.regs.reg(2), n(4));
        assert_eq!(cpu.regs.acc, n(1));
        assert!(cpu.regs.carry);
    }

    #[test]
    fn test_pc_wraps_at_end_of_memory() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xD3, 0x01]).unwrap();
        cpu.regs.pc = Addr12::new(0xFFF);

        let report = cpu.run().unwrap();
        assert_eq!(report.accumulator, n(3));
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn test_run_limited_stops_runaway_program() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0x40, 0x00]).unwrap();

        let outcome = cpu.run_limited(100).unwrap();
        assert_eq!(outcome, RunOutcome::StepLimit { steps: 100 });
        assert!(cpu.is_running());
    }

    #[test]
    fn test_trap_vector_is_plain_call_without_handler() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Jms { target: TRAP_VECTOR }])).unwrap();
        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc, TRAP_VECTOR);
        assert_eq!(cpu.stack.frames(), &[Addr12::new(2)]);
    }

    #[test]
    fn test_halt_trap() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::Ldm { data: n(4) },
            Instruction::Jms { target: TRAP_VECTOR },
        ]))
        .unwrap();

        let mut trap = HaltTrap;
        let mut hooks = Hooks::default().with_trap(&mut trap);
        let outcome = cpu.run_with(&mut hooks, None).unwrap();

        match outcome {
            RunOutcome::Halted(report) => {
                assert_eq!(report.reason, HaltReason::Trap);
                assert_eq!(report.accumulator, n(4));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(cpu.stack.depth(), 0);
    }

    #[test]
    fn test_console_trap_services() {
        let mut program = make_program(&[Instruction::Jms { target: TRAP_VECTOR }]);
        program.extend([ConsoleTrap::SAY, b'O']);
        program.extend(make_program(&[Instruction::Fim { pair: 0, data: 0x0B }]));
        program.extend(make_program(&[Instruction::Jms { target: TRAP_VECTOR }]));
        program.extend([ConsoleTrap::PUTN, 1]);
        program.extend(make_program(&[Instruction::Jms { target: TRAP_VECTOR }]));
        program.push(ConsoleTrap::HALT);

        let mut cpu = Cpu::new();
        cpu.load_program(&program).unwrap();
        let mut console = ConsoleTrap::new();
        let outcome = cpu.run_with(&mut Hooks::default().with_trap(&mut console), None).unwrap();

        assert!(matches!(outcome, RunOutcome::Halted(HaltReport { reason: HaltReason::Trap, .. })));
        assert_eq!(console.output, "OB");
    }

    /// Scribbles over the CPU, then asks for the real call.
    struct ClobberThenCall;

    impl TrapHandler for ClobberThenCall {
        fn on_trap(&mut self, cpu: &mut Cpu) -> TrapAction {
            cpu.regs.acc = n(0xE);
            cpu.regs.set_reg(7, n(0x9));
            cpu.regs.advance_pc();
            TrapAction::Call
        }
    }

    fn cpu_with_full_stack(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(program).unwrap();
        for level in 1..=3 {
            cpu.stack.push(Addr12::new(0x100 * level)).unwrap();
        }
        cpu
    }

    #[test]
    fn test_trap_call_on_full_stack_leaves_no_partial_effects() {
        let mut cpu = cpu_with_full_stack(&make_program(&[Instruction::Jms { target: TRAP_VECTOR }]));
        let before = cpu.clone();

        let mut handler = ClobberThenCall;
        let err = cpu.step_with(&mut Hooks::default().with_trap(&mut handler)).unwrap_err();

        assert_eq!(
            err,
            CpuError::Fault { pc: Addr12::ZERO, source: StackError::Overflow { addr: Addr12::new(2) } }
        );
        assert_eq!(cpu.state, CpuState::Halted(HaltReason::StackOverflow));
        assert_eq!(cpu.regs, before.regs);
        assert_eq!(cpu.stack, before.stack);
        assert_eq!(cpu.steps, 0);
    }

    #[test]
    fn test_console_service_runs_on_full_stack() {
        let mut program = make_program(&[Instruction::Jms { target: TRAP_VECTOR }]);
        program.extend([ConsoleTrap::SAY, b'!']);
        program.push(0x01);
        let mut cpu = cpu_with_full_stack(&program);

        let mut console = ConsoleTrap::new();
        let report = match cpu.run_with(&mut Hooks::default().with_trap(&mut console), None).unwrap() {
            RunOutcome::Halted(report) => report,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(report.reason, HaltReason::Instruction);
        assert_eq!(console.output, "!");
        assert_eq!(cpu.stack.depth(), 3);
    }

    #[test]
    fn test_trace_records_each_step() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xD2, 0xF2, 0x01]).unwrap();
        let mut trace: Vec<TraceEntry> = Vec::new();
        cpu.run_with(&mut Hooks::default().with_trace(&mut trace), None).unwrap();

        assert_eq!(trace.len(), 3);
        assert_eq!(trace[1].instruction, Instruction::Iac);
        assert_eq!(trace[1].acc, n(3));
        assert_eq!(trace[2].pc.value(), 2);
    }

    #[test]
    fn test_reset_keeps_program() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0xD5, 0x01]).unwrap();
        cpu.run().unwrap();
        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.regs.acc, n(0));
        assert_eq!(cpu.run().unwrap().accumulator, n(5));
    }
}
