//! Fixed-width unsigned machine values.
//!
//! The 4004 computes on 4-bit quantities and addresses 4096 words of
//! program memory. Both widths are enforced by construction so a value
//! outside the hardware range can never be stored.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A 4-bit value in `0..=15`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Nibble(u8);

/// A 12-bit program address in `0..=4095`.
///
/// The high 4 bits select one of 16 pages of 256 words; the low 8 bits
/// select the word within the page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Addr12(u16);

/// A raw value too wide for the machine type it was converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value {value} exceeds {max}")]
pub struct RangeError {
    pub value: u16,
    pub max: u16,
}

// ============================================================================
// Nibble Implementation
// ============================================================================

impl Nibble {
    /// Bit mask for the value range.
    pub const MASK: u8 = 0x0F;

    /// Largest representable value.
    pub const MAX: Nibble = Nibble(0x0F);

    /// The zero nibble.
    pub const ZERO: Nibble = Nibble(0);

    /// Create a nibble from the low 4 bits of `value`.
    #[inline]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    /// Create from a value that must already be in range.
    ///
    /// Returns `None` if `value > 15`.
    #[inline]
    pub const fn try_new(value: u8) -> Option<Self> {
        if value <= Self::MASK {
            Some(Self(value))
        } else {
            None
        }
    }

    /// The raw value.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// True when the value is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Test a single bit (0 = LSB).
    #[inline]
    pub const fn bit(self, index: u8) -> bool {
        (self.0 >> index) & 1 == 1
    }

    /// Join a high and a low nibble into a byte.
    #[inline]
    pub const fn join(high: Nibble, low: Nibble) -> u8 {
        (high.0 << 4) | low.0
    }

    /// Split a byte into `(high, low)` nibbles.
    #[inline]
    pub const fn split(byte: u8) -> (Nibble, Nibble) {
        (Nibble(byte >> 4), Nibble(byte & Self::MASK))
    }
}

impl From<Nibble> for u8 {
    fn from(n: Nibble) -> u8 {
        n.0
    }
}

impl TryFrom<u8> for Nibble {
    type Error = RangeError;

    fn try_from(value: u8) -> Result<Self, RangeError> {
        Self::try_new(value).ok_or(RangeError {
            value: u16::from(value),
            max: u16::from(Self::MASK),
        })
    }
}

impl fmt::Debug for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}h", self.0)
    }
}

impl fmt::Display for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

// ============================================================================
// Addr12 Implementation
// ============================================================================

impl Addr12 {
    /// Bit mask for the address range.
    pub const MASK: u16 = 0x0FFF;

    /// Number of addressable program words.
    pub const SPACE: usize = 4096;

    /// Address zero (reset vector).
    pub const ZERO: Addr12 = Addr12(0);

    /// Create an address from the low 12 bits of `value`.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value & Self::MASK)
    }

    /// Assemble an address from a page number and an in-page offset.
    #[inline]
    pub const fn from_parts(page: Nibble, low: u8) -> Self {
        Self(((page.0 as u16) << 8) | low as u16)
    }

    /// The raw value.
    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    /// The address as a memory index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The page (high 4 bits).
    #[inline]
    pub const fn page(self) -> Nibble {
        Nibble((self.0 >> 8) as u8)
    }

    /// The in-page offset (low 8 bits).
    #[inline]
    pub const fn low(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Keep the page and replace the in-page offset.
    #[inline]
    pub const fn with_low(self, low: u8) -> Self {
        Self((self.0 & 0x0F00) | low as u16)
    }

    /// Advance by `words`, wrapping at the end of the address space.
    #[inline]
    pub const fn wrapping_add(self, words: u16) -> Self {
        Self(self.0.wrapping_add(words) & Self::MASK)
    }
}

impl From<Addr12> for u16 {
    fn from(a: Addr12) -> u16 {
        a.0
    }
}

impl TryFrom<u16> for Addr12 {
    type Error = RangeError;

    fn try_from(value: u16) -> Result<Self, RangeError> {
        if value <= Self::MASK {
            Ok(Self(value))
        } else {
            Err(RangeError { value, max: Self::MASK })
        }
    }
}

impl fmt::Debug for Addr12 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}h", self.0)
    }
}

impl fmt::Display for Addr12 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}", self.0)
    }
}
