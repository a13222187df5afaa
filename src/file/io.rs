//! Low-level byte order and safe reading/writing utilities.
//!
//! This module provides endian-aware, bounds-checked conversion between byte buffers and the
//! primitive types an instruction decoder consumes. Every higher layer (the [`crate::Parser`]
//! cursor, the [`crate::DecodeBuffer`] stream codec and the persisted index format) is built on
//! these helpers.
//!
//! # Key Components
//!
//! - [`ByteIO`] - Trait defining endian-aware conversions for primitive types
//! - [`ByteOrder`] - Runtime selectable byte order
//! - [`read_le_at`] / [`read_be_at`] - Read values at an offset with auto-advance
//! - [`write_le_at`] / [`write_be_at`] - Write values at an offset with auto-advance
//! - [`read_uint_le_at`] / [`write_uint_le_at`] - Variable width (1..=8 byte) unsigned fields
//! - [`write_7bit_encoded_int`] / [`write_prefixed_string_utf8`] - Compact descriptor fields
//!
//! # Examples
//!
//! ```rust
//! use opscope::file::io::{read_le_at, write_le_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut data, &mut offset, 1u16)?;
//! write_le_at(&mut data, &mut offset, 2u32)?;
//! assert_eq!(offset, 6);
//!
//! offset = 0;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 1);
//! assert_eq!(read_le_at::<u32>(&data, &mut offset)?, 2);
//! # Ok::<(), opscope::Error>(())
//! ```
//!
//! All functions return [`crate::Error::OutOfBounds`] if the buffer is too short. They are pure
//! and can be called concurrently from multiple threads.

use std::io::Write;

use crate::{Error::OutOfBounds, Result};

/// Byte order used to interpret multi-byte primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum ByteOrder {
    /// Least significant byte first
    #[default]
    LittleEndian,
    /// Most significant byte first
    BigEndian,
}

impl ByteOrder {
    /// Read a `T` at `offset` in this byte order, advancing the offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
    pub fn read_at<T: ByteIO>(self, data: &[u8], offset: &mut usize) -> Result<T> {
        match self {
            ByteOrder::LittleEndian => read_le_at(data, offset),
            ByteOrder::BigEndian => read_be_at(data, offset),
        }
    }

    /// Write a `T` at `offset` in this byte order, advancing the offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
    pub fn write_at<T: ByteIO>(self, data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
        match self {
            ByteOrder::LittleEndian => write_le_at(data, offset, value),
            ByteOrder::BigEndian => write_be_at(data, offset, value),
        }
    }
}

/// Trait for implementing type-specific safe binary data reading and writing operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait ByteIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_byte_io {
    ($($ty:ty),*) => {
        $(
            impl ByteIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_byte_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Safely reads a value of type `T` in big-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be<T: ByteIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Safely reads a value of type `T` in big-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ByteIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}

/// Writes a value of type `T` in little-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    write_raw_at(data, offset, bytes.as_ref())
}

/// Writes a value of type `T` in big-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_be_at<T: ByteIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_be_bytes();
    write_raw_at(data, offset, bytes.as_ref())
}

fn write_raw_at(data: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<()> {
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Reads an unsigned little-endian value of `width` bytes (1..=8), low byte first.
///
/// This is the encoding of the position fields in a persisted index, whose width depends on
/// the size of the payload area.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes, or
/// [`crate::Error::Malformed`] if `width` is not in `1..=8`.
pub fn read_uint_le_at(data: &[u8], offset: &mut usize, width: usize) -> Result<u64> {
    if width == 0 || width > 8 {
        return Err(malformed_error!("Invalid unsigned field width - {}", width));
    }

    let Some(end) = offset.checked_add(width) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let value = data[*offset..end]
        .iter()
        .rev()
        .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte));

    *offset = end;
    Ok(value)
}

/// Writes an unsigned little-endian value into `width` bytes (1..=8), low byte first.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the value does not fit into `width` bytes or the width
/// is invalid, and [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_uint_le_at(
    data: &mut [u8],
    offset: &mut usize,
    width: usize,
    value: u64,
) -> Result<()> {
    if width == 0 || width > 8 {
        return Err(malformed_error!("Invalid unsigned field width - {}", width));
    }
    if width < 8 && value >> (width * 8) != 0 {
        return Err(malformed_error!(
            "Value {:#x} does not fit into {} bytes",
            value,
            width
        ));
    }

    let bytes = value.to_le_bytes();
    write_raw_at(data, offset, &bytes[..width])
}

/// Writes `value` as a 7-bit encoded integer, the inverse of
/// [`crate::file::parser::Parser::read_7bit_encoded_int`].
///
/// # Errors
/// Propagates failures of `writer`.
pub fn write_7bit_encoded_int(writer: &mut dyn Write, value: u32) -> Result<()> {
    let mut value = value;
    let mut encoded = [0_u8; 5];
    let mut length = 0;

    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;

        if value == 0 {
            encoded[length] = byte;
            length += 1;
            break;
        }

        encoded[length] = byte | 0x80;
        length += 1;
    }

    writer.write_all(&encoded[..length])?;
    Ok(())
}

/// Writes a length-prefixed UTF-8 string, the inverse of
/// [`crate::file::parser::Parser::read_prefixed_string_utf8`].
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for strings longer than `u32::MAX` bytes and propagates
/// failures of `writer`.
pub fn write_prefixed_string_utf8(writer: &mut dyn Write, value: &str) -> Result<()> {
    let length = u32::try_from(value.len())
        .map_err(|_| malformed_error!("String of {} bytes is too long", value.len()))?;

    write_7bit_encoded_int(writer, length)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_u16() {
        let result = read_le::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_u64() {
        let result = read_le::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_be_u32() {
        let result = read_be::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0102_0304);
    }

    #[test]
    fn read_be_i16() {
        let result = read_be::<i16>(&[0xFF, 0xFE]).unwrap();
        assert_eq!(result, -2);
    }

    #[test]
    fn read_floats() {
        let bytes = 1.5_f32.to_le_bytes();
        assert_eq!(read_le::<f32>(&bytes).unwrap(), 1.5);

        let bytes = (-2.25_f64).to_be_bytes();
        assert_eq!(read_be::<f64>(&bytes).unwrap(), -2.25);
    }

    #[test]
    fn read_advances_offset() {
        let mut offset = 2;
        let value = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(value, 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_out_of_bounds() {
        let mut offset = 6;
        let result = read_le_at::<u32>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(Error::OutOfBounds)));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_be_at::<u16>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn byte_order_dispatch() {
        let mut offset = 0;
        assert_eq!(
            ByteOrder::BigEndian
                .read_at::<u16>(&TEST_BUFFER, &mut offset)
                .unwrap(),
            0x0102
        );
        assert_eq!(
            ByteOrder::LittleEndian
                .read_at::<u16>(&TEST_BUFFER, &mut offset)
                .unwrap(),
            0x0403
        );

        let mut data = [0u8; 4];
        let mut offset = 0;
        ByteOrder::BigEndian
            .write_at(&mut data, &mut offset, 0x0A0B_u16)
            .unwrap();
        ByteOrder::LittleEndian
            .write_at(&mut data, &mut offset, 0x0A0B_u16)
            .unwrap();
        assert_eq!(data, [0x0A, 0x0B, 0x0B, 0x0A]);
    }

    #[test]
    fn write_out_of_bounds() {
        let mut data = [0u8; 3];
        let mut offset = 0;
        assert!(matches!(
            write_le_at(&mut data, &mut offset, 1_u32),
            Err(Error::OutOfBounds)
        ));
        assert_eq!(offset, 0);
    }

    #[test]
    fn uint_fields() {
        let mut data = [0u8; 8];
        let mut offset = 0;
        write_uint_le_at(&mut data, &mut offset, 2, 0x1234).unwrap();
        write_uint_le_at(&mut data, &mut offset, 4, 0xAABB_CCDD).unwrap();
        assert_eq!(offset, 6);
        assert_eq!(&data[..6], &[0x34, 0x12, 0xDD, 0xCC, 0xBB, 0xAA]);

        let mut offset = 0;
        assert_eq!(read_uint_le_at(&data, &mut offset, 2).unwrap(), 0x1234);
        assert_eq!(read_uint_le_at(&data, &mut offset, 4).unwrap(), 0xAABB_CCDD);

        let mut offset = 0;
        assert!(write_uint_le_at(&mut data, &mut offset, 2, 0x1_0000).is_err());
        assert!(read_uint_le_at(&data, &mut offset, 9).is_err());
    }

    #[test]
    fn seven_bit_encoding() {
        for (value, expected) in [
            (0_u32, vec![0x00]),
            (0x7F, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (u32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ] {
            let mut data = Vec::new();
            write_7bit_encoded_int(&mut data, value).unwrap();
            assert_eq!(data, expected);
        }

        let mut data = Vec::new();
        write_prefixed_string_utf8(&mut data, "ldc").unwrap();
        assert_eq!(data, [0x03, b'l', b'd', b'c']);
    }
}
