//! MCS-4 memory subsystem.
//!
//! Two independent stores:
//! - [`ProgramMemory`]: 4096 eight-bit words (4001 ROM space). Read-only
//!   while a program runs, except through [`ProgramMemory::promote_nibble`],
//!   the single audited path used by `WPM`.
//! - [`DataMemory`]: 4002 RAM, nibble-addressable, split into 8 banks that
//!   are chosen with `DCL` and addressed through the latch loaded by `SRC`.
//!
//! Data RAM layout per bank: 4 chips x 4 registers x 16 main characters,
//! plus 4 status characters per register. Nibbles are packed two per byte,
//! the even index in the high half.

use crate::asm::image::{LoadError, ProgramImage};
use crate::nibble::{Addr12, Nibble};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of program words.
pub const PROGRAM_SIZE: usize = Addr12::SPACE;

/// Number of selectable data RAM banks.
pub const BANK_COUNT: usize = 8;

/// RAM chips per bank.
pub const CHIPS_PER_BANK: usize = 4;

/// Main characters per bank (4 chips x 4 registers x 16 characters).
pub const MAIN_NIBBLES_PER_BANK: usize = 256;

/// Status characters per bank (4 chips x 4 registers x 4 characters).
pub const STATUS_NIBBLES_PER_BANK: usize = 64;

/// Number of ROM I/O port latches.
pub const ROM_PORT_COUNT: usize = 16;

/// ROM port whose value supplies the page for program-memory writes.
pub const WPM_PAGE_PORT: u8 = 0x0E;

// ============================================================================
// Program Memory
// ============================================================================

/// A restored snapshot whose shape no real machine could have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("{store} holds {actual} entries, expected {expected}")]
    Length {
        store: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("{field} is {value}, limit is {limit}")]
    Field {
        field: &'static str,
        value: usize,
        limit: usize,
    },
}

fn check_len(store: &'static str, actual: usize, expected: usize) -> Result<(), SnapshotError> {
    if actual == expected {
        Ok(())
    } else {
        Err(SnapshotError::Length { store, actual, expected })
    }
}

/// Program memory: 4096 eight-bit words.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgramWords")]
pub struct ProgramMemory {
    words: Vec<u8>,
}

#[derive(Deserialize)]
struct ProgramWords {
    words: Vec<u8>,
}

impl TryFrom<ProgramWords> for ProgramMemory {
    type Error = SnapshotError;

    fn try_from(raw: ProgramWords) -> Result<Self, SnapshotError> {
        check_len("program memory", raw.words.len(), PROGRAM_SIZE)?;
        Ok(Self { words: raw.words })
    }
}

impl ProgramMemory {
    /// Create program memory filled with `NOP` (0x00).
    pub fn new() -> Self {
        Self {
            words: vec![0; PROGRAM_SIZE],
        }
    }

    /// Read the word at `addr`.
    #[inline]
    pub fn read(&self, addr: Addr12) -> u8 {
        self.words[addr.index()]
    }

    /// Read an embedded table entry relative to the current page.
    ///
    /// The high 4 bits come from `pc`, only the low byte comes from
    /// `offset`. A table is therefore only reachable from code in the
    /// same page.
    #[inline]
    pub fn fetch_indirect(&self, pc: Addr12, offset: u8) -> u8 {
        self.read(pc.with_low(offset))
    }

    /// Replace the contents with an image, zero-filling the remainder.
    pub fn load_image(&mut self, image: &ProgramImage) {
        let bytes = image.as_bytes();
        self.words[..bytes.len()].copy_from_slice(bytes);
        self.words[bytes.len()..].fill(0);
        tracing::debug!(bytes = bytes.len(), "program memory loaded");
    }

    /// Load raw bytes at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        let image = ProgramImage::from_bytes(program)?;
        self.load_image(&image);
        Ok(())
    }

    /// Write one half of a program word from data space.
    ///
    /// This is the only mutation of program memory after load. `high`
    /// selects the upper nibble of the word; the other half is preserved.
    pub fn promote_nibble(&mut self, addr: Addr12, high: bool, value: Nibble) {
        let cell = &mut self.words[addr.index()];
        let (old_high, old_low) = Nibble::split(*cell);
        *cell = if high {
            Nibble::join(value, old_low)
        } else {
            Nibble::join(old_high, value)
        };
        tracing::debug!(%addr, high, value = value.value(), word = *cell, "promoted data write into program memory");
    }

    /// The full 4096-word contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.words
    }

    /// Clear to `NOP`.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Dump words (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = (start + count).min(PROGRAM_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.words[i]))
            .collect()
    }
}

impl Default for ProgramMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgramMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.words.iter().filter(|w| **w != 0).count();
        f.debug_struct("ProgramMemory")
            .field("non_zero_words", &non_zero)
            .field("total_words", &PROGRAM_SIZE)
            .finish()
    }
}

// ============================================================================
// Data Memory
// ============================================================================

/// Banked 4002 data RAM plus the I/O latches that live beside it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DataMemoryFields")]
pub struct DataMemory {
    /// Main characters, two per byte, bank-major.
    main: Vec<u8>,
    /// Status characters, two per byte, bank-major.
    status: Vec<u8>,
    /// RAM output ports, one per chip per bank.
    ram_ports: Vec<Nibble>,
    /// ROM I/O port latches, indexed by chip select.
    rom_ports: [Nibble; ROM_PORT_COUNT],
    /// Active bank (`DCL`).
    bank: u8,
    /// Address latched by `SRC`.
    latch: u8,
    /// Next `WPM` writes the high half of the program word.
    wpm_high_next: bool,
}

#[derive(Deserialize)]
struct DataMemoryFields {
    main: Vec<u8>,
    status: Vec<u8>,
    ram_ports: Vec<Nibble>,
    rom_ports: [Nibble; ROM_PORT_COUNT],
    bank: u8,
    latch: u8,
    wpm_high_next: bool,
}

impl TryFrom<DataMemoryFields> for DataMemory {
    type Error = SnapshotError;

    fn try_from(raw: DataMemoryFields) -> Result<Self, SnapshotError> {
        check_len("main characters", raw.main.len(), BANK_COUNT * MAIN_NIBBLES_PER_BANK / 2)?;
        check_len("status characters", raw.status.len(), BANK_COUNT * STATUS_NIBBLES_PER_BANK / 2)?;
        check_len("RAM output ports", raw.ram_ports.len(), BANK_COUNT * CHIPS_PER_BANK)?;
        if usize::from(raw.bank) >= BANK_COUNT {
            return Err(SnapshotError::Field {
                field: "bank",
                value: usize::from(raw.bank),
                limit: BANK_COUNT - 1,
            });
        }
        Ok(Self {
            main: raw.main,
            status: raw.status,
            ram_ports: raw.ram_ports,
            rom_ports: raw.rom_ports,
            bank: raw.bank,
            latch: raw.latch,
            wpm_high_next: raw.wpm_high_next,
        })
    }
}

impl DataMemory {
    /// Create zeroed data memory with bank 0 selected and latch 0.
    pub fn new() -> Self {
        Self {
            main: vec![0; BANK_COUNT * MAIN_NIBBLES_PER_BANK / 2],
            status: vec![0; BANK_COUNT * STATUS_NIBBLES_PER_BANK / 2],
            ram_ports: vec![Nibble::ZERO; BANK_COUNT * CHIPS_PER_BANK],
            rom_ports: [Nibble::ZERO; ROM_PORT_COUNT],
            bank: 0,
            latch: 0,
            wpm_high_next: true,
        }
    }

    /// Select the active bank. Only the low 3 bits are significant.
    pub fn select_bank(&mut self, n: Nibble) {
        self.bank = n.value() & 0x07;
        tracing::trace!(bank = self.bank, "bank selected");
    }

    /// Latch the working address sent by `SRC`.
    ///
    /// Bits 7-6 select the chip, bits 5-4 the register on that chip, bits
    /// 3-0 the character within the register.
    pub fn latch_address(&mut self, byte: u8) {
        self.latch = byte;
        tracing::trace!(latch = byte, "address latched");
    }

    /// Active bank.
    #[inline]
    pub fn bank(&self) -> u8 {
        self.bank
    }

    /// Latched address.
    #[inline]
    pub fn latch(&self) -> u8 {
        self.latch
    }

    /// Chip selected by the latch (0-3).
    #[inline]
    pub fn chip(&self) -> u8 {
        self.latch >> 6
    }

    /// Register selected by the latch, chip included (0-15).
    #[inline]
    pub fn register(&self) -> u8 {
        self.latch >> 4
    }

    /// Character selected by the latch (0-15).
    #[inline]
    pub fn character(&self) -> u8 {
        self.latch & 0x0F
    }

    /// Read the main character at bank + latch.
    pub fn read_nibble(&self) -> Nibble {
        get_packed(&self.main, self.main_index())
    }

    /// Write the main character at bank + latch.
    pub fn write_nibble(&mut self, value: Nibble) {
        let index = self.main_index();
        set_packed(&mut self.main, index, value);
    }

    /// Read status character `i` (0-3) of the latched register.
    pub fn read_status(&self, i: u8) -> Nibble {
        get_packed(&self.status, self.status_index(i))
    }

    /// Write status character `i` (0-3) of the latched register.
    pub fn write_status(&mut self, i: u8, value: Nibble) {
        let index = self.status_index(i);
        set_packed(&mut self.status, index, value);
    }

    /// Write the output port of the latched chip in the active bank.
    pub fn write_output_port(&mut self, value: Nibble) {
        let index = usize::from(self.bank) * CHIPS_PER_BANK + usize::from(self.chip());
        self.ram_ports[index] = value;
        tracing::debug!(bank = self.bank, chip = self.chip(), value = value.value(), "RAM output port written");
    }

    /// Current value of a RAM output port.
    pub fn output_port(&self, bank: u8, chip: u8) -> Nibble {
        let index = usize::from(bank & 0x07) * CHIPS_PER_BANK + usize::from(chip & 0x03);
        self.ram_ports[index]
    }

    /// Write the ROM port selected by the latch's high nibble.
    pub fn write_rom_port(&mut self, value: Nibble) {
        self.rom_ports[usize::from(self.latch >> 4)] = value;
    }

    /// Read back the ROM port selected by the latch's high nibble.
    ///
    /// No input devices are attached, so this returns the last value
    /// written.
    pub fn read_rom_port(&self) -> Nibble {
        self.rom_ports[usize::from(self.latch >> 4)]
    }

    /// Current value of ROM port `chip`.
    pub fn rom_port(&self, chip: u8) -> Nibble {
        self.rom_ports[usize::from(chip & 0x0F)]
    }

    /// Program address targeted by the next `WPM`, and which half it writes.
    ///
    /// Flips the half toggle, so each call corresponds to one `WPM`.
    pub fn next_program_write(&mut self) -> (Addr12, bool) {
        let addr = Addr12::from_parts(self.rom_port(WPM_PAGE_PORT), self.latch);
        let high = self.wpm_high_next;
        self.wpm_high_next = !high;
        (addr, high)
    }

    /// Read any main character directly (for hosts and tests).
    pub fn peek(&self, bank: u8, addr: u8) -> Nibble {
        let index = usize::from(bank & 0x07) * MAIN_NIBBLES_PER_BANK + usize::from(addr);
        get_packed(&self.main, index)
    }

    /// Clear all storage and latches.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn main_index(&self) -> usize {
        usize::from(self.bank) * MAIN_NIBBLES_PER_BANK + usize::from(self.latch)
    }

    fn status_index(&self, i: u8) -> usize {
        usize::from(self.bank) * STATUS_NIBBLES_PER_BANK
            + usize::from(self.register()) * 4
            + usize::from(i & 0x03)
    }
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataMemory")
            .field("bank", &self.bank)
            .field("latch", &format_args!("{:02X}h", self.latch))
            .field("wpm_high_next", &self.wpm_high_next)
            .finish()
    }
}

/// Read nibble `index` from a packed store.
fn get_packed(cells: &[u8], index: usize) -> Nibble {
    let (high, low) = Nibble::split(cells[index / 2]);
    if index % 2 == 0 { high } else { low }
}

/// Write nibble `index` of a packed store, preserving its neighbour.
fn set_packed(cells: &mut [u8], index: usize, value: Nibble) {
    let cell = &mut cells[index / 2];
    let (high, low) = Nibble::split(*cell);
    *cell = if index % 2 == 0 {
        Nibble::join(value, low)
    } else {
        Nibble::join(high, value)
    };
}
