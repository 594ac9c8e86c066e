//! Binary program images.
//!
//! An image is the raw byte sequence placed into program memory: byte N
//! lands at address N, anything past the end reads as `NOP`.

use crate::nibble::Addr12;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// A validated program image of at most 4096 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    bytes: Vec<u8>,
}

impl ProgramImage {
    /// Largest image that fits in program memory.
    pub const MAX_LEN: usize = Addr12::SPACE;

    /// Wrap a byte sequence, rejecting anything larger than program memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() > Self::MAX_LEN {
            return Err(LoadError::TooLarge {
                size: bytes.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Load an image from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let image = Self::from_bytes(&bytes)?;
        tracing::debug!(path = %path.display(), len = image.len(), "image loaded");
        Ok(image)
    }

    /// Read an image from any byte source.
    ///
    /// Reads at most one byte past the limit, so an endless source is
    /// rejected as too large rather than read forever.
    pub fn read_from<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut bytes = Vec::new();
        reader
            .take(Self::MAX_LEN as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| LoadError::Io {
                path: "<reader>".to_string(),
                message: e.to_string(),
            })?;
        Self::from_bytes(&bytes)
    }

    /// The image bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the image.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Classic `offset  hex  |ascii|` dump, `width` bytes per line.
    pub fn hexdump(&self, width: usize) -> String {
        let width = width.max(1);
        let mut out = String::new();
        for (row, chunk) in self.bytes.chunks(width).enumerate() {
            let hex = chunk
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&b| if (32..127).contains(&b) { char::from(b) } else { '.' })
                .collect();
            out.push_str(&format!("{:08X}  {:<pad$}  |{}|\n", row * width, hex, ascii, pad = width * 3));
        }
        out
    }
}

impl From<ProgramImage> for Vec<u8> {
    fn from(image: ProgramImage) -> Self {
        image.bytes
    }
}

/// Errors that can occur while obtaining a program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("cannot read image {path}: {message}")]
    Io { path: String, message: String },

    #[error("image is {size} bytes, program memory holds {max}")]
    TooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_size_image_accepted() {
        let image = ProgramImage::from_bytes(&[0u8; 4096]).unwrap();
        assert_eq!(image.len(), 4096);
    }

    #[test]
    fn test_oversized_image_rejected() {
        let err = ProgramImage::from_bytes(&[0u8; 4097]).unwrap_err();
        assert_eq!(err, LoadError::TooLarge { size: 4097, max: 4096 });
    }

    #[test]
    fn test_read_from_stops_past_limit() {
        let source = std::io::repeat(0xAA);
        let err = ProgramImage::read_from(source).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { size: 4097, .. }));
    }

    #[test]
    fn test_read_from_slice() {
        let image = ProgramImage::read_from(&[0xD5u8, 0x01][..]).unwrap();
        assert_eq!(image.as_bytes(), &[0xD5, 0x01]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ProgramImage::load("/nonexistent/dir/prog.bin").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_hexdump_layout() {
        let image = ProgramImage::from_bytes(b"Hi\x00\x01").unwrap();
        let dump = image.hexdump(4);
        assert_eq!(dump, "00000000  48 69 00 01   |Hi..|\n");
    }

    #[test]
    fn test_hexdump_multiple_rows() {
        let image = ProgramImage::from_bytes(&[0x41; 5]).unwrap();
        let dump = image.hexdump(4);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000004  41 "));
        assert!(lines[1].ends_with("|A|"));
    }
}
