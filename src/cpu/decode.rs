//! Instruction decoder for the 4004.
//!
//! Every instruction starts with an 8-bit word. The high nibble (OPR)
//! selects one of 16 families, the low nibble (OPA) is a register, a pair,
//! immediate data, a condition, or a sub-opcode. Five forms take a second
//! word: JCN, FIM, JUN, JMS and ISZ.
//!
//! Decoding never fails. Unassigned OPA values in families 0 and F decode to
//! [`Instruction::Undefined`], which executes as a no-op.

use crate::nibble::{Addr12, Nibble};
use serde::{Serialize, Deserialize};

/// JCN condition field.
///
/// ```text
/// bit 3  invert the result
/// bit 2  accumulator is zero
/// bit 1  carry is set
/// bit 0  TEST pin is low
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(Nibble);

impl Condition {
    /// Invert bit.
    pub const INVERT: u8 = 0b1000;
    /// Accumulator-zero test.
    pub const ACC_ZERO: u8 = 0b0100;
    /// Carry-set test.
    pub const CARRY: u8 = 0b0010;
    /// TEST-pin-low test.
    pub const TEST: u8 = 0b0001;

    /// Create from the 4-bit condition field.
    pub const fn new(bits: u8) -> Self {
        Self(Nibble::new(bits))
    }

    /// Raw condition bits.
    pub const fn bits(self) -> u8 {
        self.0.value()
    }

    /// True when the result is inverted.
    pub const fn inverted(self) -> bool {
        self.bits() & Self::INVERT != 0
    }

    /// Evaluate against the current flags.
    ///
    /// The selected tests are OR-ed; the invert bit complements the result.
    /// With no tests selected the non-inverted form never jumps and the
    /// inverted form always jumps.
    pub fn holds(self, acc: Nibble, carry: bool, test_low: bool) -> bool {
        let bits = self.bits();
        let any = (bits & Self::ACC_ZERO != 0 && acc.is_zero())
            || (bits & Self::CARRY != 0 && carry)
            || (bits & Self::TEST != 0 && test_low);
        any != self.inverted()
    }
}

/// Decoded 4004 instruction.
///
/// Register operands are 0-15, pair operands are 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Family 0 ====================

    /// No operation.
    Nop,

    /// Halt (0x01, as on the 4040).
    Hlt,

    // ==================== Jumps & Immediates ====================

    /// Jump conditional within the page: if cond then PC.low := target.
    Jcn { cond: Condition, target: u8 },

    /// Fetch immediate: Pp := data.
    Fim { pair: u8, data: u8 },

    /// Send register control: latch Pp as the RAM/port address.
    Src { pair: u8 },

    /// Fetch indirect: Pp := ROM[page | P0].
    Fin { pair: u8 },

    /// Jump indirect within the page: PC.low := Pp.
    Jin { pair: u8 },

    /// Jump unconditional: PC := target.
    Jun { target: Addr12 },

    /// Jump to subroutine: push return address, PC := target.
    Jms { target: Addr12 },

    /// Increment register (carry unaffected).
    Inc { reg: u8 },

    /// Increment and skip if zero: jump within the page while non-zero.
    Isz { reg: u8, target: u8 },

    // ==================== Register Arithmetic ====================

    /// A := A + R + CY.
    Add { reg: u8 },

    /// A := A - R - CY (CY clear means borrow).
    Sub { reg: u8 },

    /// A := R.
    Ld { reg: u8 },

    /// Exchange A and R.
    Xch { reg: u8 },

    /// Return from subroutine, A := data.
    Bbl { data: Nibble },

    /// A := data.
    Ldm { data: Nibble },

    // ==================== I/O and RAM (family E) ====================

    /// Write A to the latched RAM character.
    Wrm,
    /// Write A to the latched RAM chip's output port.
    Wmp,
    /// Write A to the latched ROM port.
    Wrr,
    /// Write A to one half of a program word.
    Wpm,
    /// Write A to status character `index` (0-3).
    Wr { index: u8 },
    /// A := A - RAM - CY.
    Sbm,
    /// A := RAM.
    Rdm,
    /// A := ROM port.
    Rdr,
    /// A := A + RAM + CY.
    Adm,
    /// A := status character `index` (0-3).
    Rd { index: u8 },

    // ==================== Accumulator Group (family F) ====================

    /// Clear A and CY.
    Clb,
    /// Clear CY.
    Clc,
    /// Increment A, CY := overflow.
    Iac,
    /// Complement CY.
    Cmc,
    /// Complement A.
    Cma,
    /// Rotate left through carry.
    Ral,
    /// Rotate right through carry.
    Rar,
    /// A := CY, clear CY.
    Tcc,
    /// Decrement A, CY := no borrow.
    Dac,
    /// A := 9 or 10 by CY, clear CY.
    Tcs,
    /// Set CY.
    Stc,
    /// Decimal adjust A.
    Daa,
    /// Keyboard process.
    Kbp,
    /// Designate command line: select RAM bank from A.
    Dcl,

    // ==================== Unassigned ====================

    /// Structurally valid but unassigned opcode; executes as NOP.
    Undefined { opcode: u8 },
}

impl Instruction {
    /// Number of words (1 or 2) occupied by an instruction starting with `opcode`.
    pub const fn word_count(opcode: u8) -> u16 {
        match opcode >> 4 {
            0x1 | 0x4 | 0x5 | 0x7 => 2,
            0x2 if opcode & 1 == 0 => 2,
            _ => 1,
        }
    }

    /// Number of words this instruction occupies.
    pub fn len(&self) -> u16 {
        match self {
            Instruction::Jcn { .. }
            | Instruction::Fim { .. }
            | Instruction::Jun { .. }
            | Instruction::Jms { .. }
            | Instruction::Isz { .. } => 2,
            _ => 1,
        }
    }

    /// The assembler mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "NOP",
            Instruction::Hlt => "HLT",
            Instruction::Jcn { .. } => "JCN",
            Instruction::Fim { .. } => "FIM",
            Instruction::Src { .. } => "SRC",
            Instruction::Fin { .. } => "FIN",
            Instruction::Jin { .. } => "JIN",
            Instruction::Jun { .. } => "JUN",
            Instruction::Jms { .. } => "JMS",
            Instruction::Inc { .. } => "INC",
            Instruction::Isz { .. } => "ISZ",
            Instruction::Add { .. } => "ADD",
            Instruction::Sub { .. } => "SUB",
            Instruction::Ld { .. } => "LD",
            Instruction::Xch { .. } => "XCH",
            Instruction::Bbl { .. } => "BBL",
            Instruction::Ldm { .. } => "LDM",
            Instruction::Wrm => "WRM",
            Instruction::Wmp => "WMP",
            Instruction::Wrr => "WRR",
            Instruction::Wpm => "WPM",
            Instruction::Wr { index } => ["WR0", "WR1", "WR2", "WR3"][usize::from(*index & 3)],
            Instruction::Sbm => "SBM",
            Instruction::Rdm => "RDM",
            Instruction::Rdr => "RDR",
            Instruction::Adm => "ADM",
            Instruction::Rd { index } => ["RD0", "RD1", "RD2", "RD3"][usize::from(*index & 3)],
            Instruction::Clb => "CLB",
            Instruction::Clc => "CLC",
            Instruction::Iac => "IAC",
            Instruction::Cmc => "CMC",
            Instruction::Cma => "CMA",
            Instruction::Ral => "RAL",
            Instruction::Rar => "RAR",
            Instruction::Tcc => "TCC",
            Instruction::Dac => "DAC",
            Instruction::Tcs => "TCS",
            Instruction::Stc => "STC",
            Instruction::Daa => "DAA",
            Instruction::Kbp => "KBP",
            Instruction::Dcl => "DCL",
            Instruction::Undefined { .. } => "DB",
        }
    }
}

/// Decode an instruction from its first word and the word that follows it.
///
/// `second` is only consulted for two-word forms (see
/// [`Instruction::word_count`]).
pub fn decode(first: u8, second: u8) -> Instruction {
    let opa = first & 0x0F;

    match first >> 4 {
        0x0 => match opa {
            0x0 => Instruction::Nop,
            0x1 => Instruction::Hlt,
            _ => Instruction::Undefined { opcode: first },
        },
        0x1 => Instruction::Jcn { cond: Condition::new(opa), target: second },
        0x2 if opa & 1 == 0 => Instruction::Fim { pair: opa >> 1, data: second },
        0x2 => Instruction::Src { pair: opa >> 1 },
        0x3 if opa & 1 == 0 => Instruction::Fin { pair: opa >> 1 },
        0x3 => Instruction::Jin { pair: opa >> 1 },
        0x4 => Instruction::Jun { target: long_target(opa, second) },
        0x5 => Instruction::Jms { target: long_target(opa, second) },
        0x6 => Instruction::Inc { reg: opa },
        0x7 => Instruction::Isz { reg: opa, target: second },
        0x8 => Instruction::Add { reg: opa },
        0x9 => Instruction::Sub { reg: opa },
        0xA => Instruction::Ld { reg: opa },
        0xB => Instruction::Xch { reg: opa },
        0xC => Instruction::Bbl { data: Nibble::new(opa) },
        0xD => Instruction::Ldm { data: Nibble::new(opa) },
        0xE => match opa {
            0x0 => Instruction::Wrm,
            0x1 => Instruction::Wmp,
            0x2 => Instruction::Wrr,
            0x3 => Instruction::Wpm,
            0x4..=0x7 => Instruction::Wr { index: opa - 0x4 },
            0x8 => Instruction::Sbm,
            0x9 => Instruction::Rdm,
            0xA => Instruction::Rdr,
            0xB => Instruction::Adm,
            _ => Instruction::Rd { index: opa - 0xC },
        },
        _ => match opa {
            0x0 => Instruction::Clb,
            0x1 => Instruction::Clc,
            0x2 => Instruction::Iac,
            0x3 => Instruction::Cmc,
            0x4 => Instruction::Cma,
            0x5 => Instruction::Ral,
            0x6 => Instruction::Rar,
            0x7 => Instruction::Tcc,
            0x8 => Instruction::Dac,
            0x9 => Instruction::Tcs,
            0xA => Instruction::Stc,
            0xB => Instruction::Daa,
            0xC => Instruction::Kbp,
            0xD => Instruction::Dcl,
            _ => Instruction::Undefined { opcode: first },
        },
    }
}

/// 12-bit target from the OPA nibble (high 4 bits) and the second word.
fn long_target(opa: u8, low: u8) -> Addr12 {
    Addr12::from_parts(Nibble::new(opa), low)
}

/// Encode an instruction back to its program words.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let one = |opr: u8, opa: u8| vec![(opr << 4) | (opa & 0x0F)];
    let two = |opr: u8, opa: u8, second: u8| vec![(opr << 4) | (opa & 0x0F), second];

    match *instr {
        Instruction::Nop => one(0x0, 0x0),
        Instruction::Hlt => one(0x0, 0x1),
        Instruction::Jcn { cond, target } => two(0x1, cond.bits(), target),
        Instruction::Fim { pair, data } => two(0x2, (pair & 7) << 1, data),
        Instruction::Src { pair } => one(0x2, ((pair & 7) << 1) | 1),
        Instruction::Fin { pair } => one(0x3, (pair & 7) << 1),
        Instruction::Jin { pair } => one(0x3, ((pair & 7) << 1) | 1),
        Instruction::Jun { target } => two(0x4, target.page().value(), target.low()),
        Instruction::Jms { target } => two(0x5, target.page().value(), target.low()),
        Instruction::Inc { reg } => one(0x6, reg),
        Instruction::Isz { reg, target } => two(0x7, reg, target),
        Instruction::Add { reg } => one(0x8, reg),
        Instruction::Sub { reg } => one(0x9, reg),
        Instruction::Ld { reg } => one(0xA, reg),
        Instruction::Xch { reg } => one(0xB, reg),
        Instruction::Bbl { data } => one(0xC, data.value()),
        Instruction::Ldm { data } => one(0xD, data.value()),
        Instruction::Wrm => one(0xE, 0x0),
        Instruction::Wmp => one(0xE, 0x1),
        Instruction::Wrr => one(0xE, 0x2),
        Instruction::Wpm => one(0xE, 0x3),
        Instruction::Wr { index } => one(0xE, 0x4 + (index & 3)),
        Instruction::Sbm => one(0xE, 0x8),
        Instruction::Rdm => one(0xE, 0x9),
        Instruction::Rdr => one(0xE, 0xA),
        Instruction::Adm => one(0xE, 0xB),
        Instruction::Rd { index } => one(0xE, 0xC + (index & 3)),
        Instruction::Clb => one(0xF, 0x0),
        Instruction::Clc => one(0xF, 0x1),
        Instruction::Iac => one(0xF, 0x2),
        Instruction::Cmc => one(0xF, 0x3),
        Instruction::Cma => one(0xF, 0x4),
        Instruction::Ral => one(0xF, 0x5),
        Instruction::Rar => one(0xF, 0x6),
        Instruction::Tcc => one(0xF, 0x7),
        Instruction::Dac => one(0xF, 0x8),
        Instruction::Tcs => one(0xF, 0x9),
        Instruction::Stc => one(0xF, 0xA),
        Instruction::Daa => one(0xF, 0xB),
        Instruction::Kbp => one(0xF, 0xC),
        Instruction::Dcl => one(0xF, 0xD),
        Instruction::Undefined { opcode } => vec![opcode],
    }
}
