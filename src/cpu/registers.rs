//! Intel 4004 CPU registers.
//!
//! The 4004 has:
//! - A: 4-bit accumulator
//! - CY: 1-bit carry/link
//! - R0-R15: sixteen 4-bit index registers, also addressed as eight
//!   pairs P0-P7 (the even register holds the high nibble)
//! - PC: 12-bit program counter

use crate::nibble::{Addr12, Nibble};
use serde::{Serialize, Deserialize};

/// Number of index registers.
pub const REGISTER_COUNT: usize = 16;

/// Number of register pairs.
pub const PAIR_COUNT: usize = 8;

/// The 4004 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R15 index registers.
    regs: [Nibble; REGISTER_COUNT],

    /// A: accumulator.
    pub acc: Nibble,

    /// CY: carry/link flag.
    pub carry: bool,

    /// PC: address of the next word to fetch.
    pub pc: Addr12,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            regs: [Nibble::ZERO; REGISTER_COUNT],
            acc: Nibble::ZERO,
            carry: false,
            pc: Addr12::ZERO,
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read index register `r` (only the low 4 bits of `r` are used).
    #[inline]
    pub fn reg(&self, r: u8) -> Nibble {
        self.regs[usize::from(r & 0x0F)]
    }

    /// Write index register `r`.
    #[inline]
    pub fn set_reg(&mut self, r: u8, value: Nibble) {
        self.regs[usize::from(r & 0x0F)] = value;
    }

    /// Read pair `p` as a byte: `R(2p)` is the high nibble.
    #[inline]
    pub fn pair(&self, p: u8) -> u8 {
        let even = (p & 0x07) << 1;
        Nibble::join(self.reg(even), self.reg(even + 1))
    }

    /// Write pair `p` from a byte.
    #[inline]
    pub fn set_pair(&mut self, p: u8, byte: u8) {
        let even = (p & 0x07) << 1;
        let (high, low) = Nibble::split(byte);
        self.set_reg(even, high);
        self.set_reg(even + 1, low);
    }

    /// All sixteen index registers, R0 first.
    pub fn index_registers(&self) -> &[Nibble; REGISTER_COUNT] {
        &self.regs
    }

    /// Fetch-side PC increment. Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> Addr12 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn jump(&mut self, addr: Addr12) {
        self.pc = addr;
    }

    /// Replace the low 8 bits of the PC, keeping its current page.
    #[inline]
    pub fn jump_in_page(&mut self, low: u8) {
        self.pc = self.pc.with_low(low);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pair_layout_even_register_is_high() {
        let mut regs = Registers::new();
        regs.set_pair(3, 0x5C);
        assert_eq!(regs.reg(6).value(), 0x5);
        assert_eq!(regs.reg(7).value(), 0xC);
        assert_eq!(regs.pair(3), 0x5C);
    }

    #[test]
    fn test_jump_in_page_keeps_page() {
        let mut regs = Registers::new();
        regs.pc = Addr12::new(0x7F3);
        regs.jump_in_page(0x10);
        assert_eq!(regs.pc.value(), 0x710);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = Addr12::new(0xFFF);

        let old = regs.advance_pc();
        assert_eq!(old.value(), 0xFFF);
        assert_eq!(regs.pc.value(), 0x000);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut regs = Registers::new();
        regs.set_reg(4, Nibble::new(9));
        regs.acc = Nibble::new(3);
        regs.carry = true;
        regs.pc = Addr12::new(0x123);

        regs.reset();
        assert_eq!(regs, Registers::new());
    }

    proptest! {
        #[test]
        fn prop_register_write_read(r in 0u8..16, v in 0u8..16) {
            let mut regs = Registers::new();
            regs.set_reg(r, Nibble::new(v));
            prop_assert_eq!(regs.reg(r).value(), v);
        }

        #[test]
        fn prop_pair_write_read(p in 0u8..8, byte in any::<u8>()) {
            let mut regs = Registers::new();
            regs.set_pair(p, byte);
            prop_assert_eq!(regs.pair(p), byte);
        }
    }
}
