//! Persisted index header.
//!
//! Layout (12 bytes, little-endian):
//!
//! | Offset | Size | Field                  |
//! |--------|------|------------------------|
//! | 0      | 4    | magic `OPIX`           |
//! | 4      | 4    | entry count            |
//! | 8      | 2    | opcode field width     |
//! | 10     | 1    | position field width   |
//! | 11     | 1    | reserved, zero         |
//!
//! The entry table of `entry count` fixed-width `(opcode, position)` pairs follows the
//! header; the payload area follows the table.

use std::io::Write;

use crate::{
    file::{io::read_le, parser::Parser},
    Error, Result,
};

/// Magic bytes at the start of every index image.
pub const INDEX_MAGIC: [u8; 4] = *b"OPIX";

/// Size of the serialized header.
pub const HEADER_SIZE: usize = 12;

/// The fixed header of an index image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Number of entries in the table
    pub entry_count: u32,
    /// Width of an encoded opcode field, including its length byte
    pub opcode_width: u16,
    /// Width of an encoded payload position
    pub position_width: u8,
}

impl IndexHeader {
    /// Parses and validates a header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MagicMismatch`] for foreign data, [`crate::Error::OutOfBounds`]
    /// if `data` is shorter than a header, and [`crate::Error::Malformed`] for invalid widths.
    pub fn read(data: &[u8]) -> Result<IndexHeader> {
        let mut parser = Parser::new(data);

        let magic = parser.read_bytes(INDEX_MAGIC.len())?;
        if magic != INDEX_MAGIC {
            return Err(Error::MagicMismatch {
                expected: format!("{:#010x}", read_le::<u32>(&INDEX_MAGIC)?),
                found: format!("{:#010x}", read_le::<u32>(magic)?),
            });
        }

        let entry_count = parser.read_le::<u32>()?;
        let opcode_width = parser.read_le::<u16>()?;
        let position_width = parser.read_le::<u8>()?;
        let reserved = parser.read_le::<u8>()?;

        if opcode_width < 2 || opcode_width > 256 || opcode_width % 2 != 0 {
            return Err(malformed_error!("Invalid opcode field width - {}", opcode_width));
        }

        if !matches!(position_width, 2 | 4 | 8) {
            return Err(malformed_error!(
                "Invalid position field width - {}",
                position_width
            ));
        }

        if reserved != 0 {
            return Err(malformed_error!("Reserved header byte is {:#04x}", reserved));
        }

        Ok(IndexHeader {
            entry_count,
            opcode_width,
            position_width,
        })
    }

    /// Writes the header.
    ///
    /// # Errors
    /// Propagates failures of `writer`.
    pub fn write(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(&INDEX_MAGIC)?;
        writer.write_all(&self.entry_count.to_le_bytes())?;
        writer.write_all(&self.opcode_width.to_le_bytes())?;
        writer.write_all(&[self.position_width, 0])?;
        Ok(())
    }

    /// Size of one `(opcode, position)` table entry.
    #[must_use]
    pub fn entry_size(&self) -> usize {
        usize::from(self.opcode_width) + usize::from(self.position_width)
    }

    /// Size of the full entry table, or `None` on overflow.
    #[must_use]
    pub fn table_size(&self) -> Option<usize> {
        usize::try_from(self.entry_count)
            .ok()?
            .checked_mul(self.entry_size())
    }
}

/// Width of the opcode field: one length byte plus the longest opcode, rounded up to even.
#[must_use]
pub fn opcode_field_width(max_opcode_length: usize) -> usize {
    let width = 1 + max_opcode_length;
    width + width % 2
}

/// Smallest of 2, 4 or 8 bytes that can address every position in a payload of `size` bytes.
#[must_use]
pub fn position_field_width(payload_size: u64) -> usize {
    if payload_size <= 1 << 16 {
        2
    } else if payload_size <= 1 << 32 {
        4
    } else {
        8
    }
}

/// Smallest of 2, 4 or 8 bytes that can hold `position` itself.
#[must_use]
pub fn position_value_width(position: u64) -> usize {
    if position <= u64::from(u16::MAX) {
        2
    } else if position <= u64::from(u32::MAX) {
        4
    } else {
        8
    }
}
