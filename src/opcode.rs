//! Opcode byte sequences.
//!
//! An [`Opcode`] is the byte sequence which identifies an instruction variant inside a code
//! stream. Opcodes are ordered first by length and then lexicographically by unsigned byte
//! value, which is the order of the persisted index table.
//!
//! Opcodes can borrow their bytes (a view into a larger buffer, used during lookup to avoid
//! allocation) or own them (used by the builder and for values that outlive the input).
//!
//! # Examples
//!
//! ```rust
//! use opscope::Opcode;
//!
//! let stream = [0x0F, 0x01, 0xC1, 0x90];
//! let vmcall = Opcode::wrap_range(&stream, 0, 3)?;
//! assert_eq!(vmcall.to_string(), "0F 01 C1");
//!
//! let nop = Opcode::parse("90")?;
//! assert!(nop < vmcall); // shorter opcodes always sort first
//!
//! let encoded = vmcall.encode(4)?;
//! assert_eq!(encoded, [0x03, 0x0F, 0x01, 0xC1]);
//! assert_eq!(Opcode::decode(&encoded)?, vmcall);
//! # Ok::<(), opscope::Error>(())
//! ```

use std::{borrow::Cow, cmp::Ordering, fmt, str::FromStr};

use crate::{Error, Result};

/// The longest opcode that can be represented; the encoded form stores the length in one byte.
pub const MAX_OPCODE_LENGTH: usize = 255;

/// An immutable, comparable opcode byte sequence of 0 to 255 bytes.
#[derive(Clone, Hash)]
pub struct Opcode<'a> {
    bytes: Cow<'a, [u8]>,
}

impl<'a> Opcode<'a> {
    /// Creates a view over `bytes` without copying.
    ///
    /// # Errors
    /// Returns [`crate::Error::OpcodeTooLong`] if `bytes` is longer than 255 bytes.
    pub fn wrap(bytes: &'a [u8]) -> Result<Opcode<'a>> {
        if bytes.len() > MAX_OPCODE_LENGTH {
            return Err(Error::OpcodeTooLong(bytes.len()));
        }

        Ok(Opcode {
            bytes: Cow::Borrowed(bytes),
        })
    }

    /// Creates a view over `length` bytes of `bytes` starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range does not lie within `bytes`, and
    /// [`crate::Error::OpcodeTooLong`] if `length` is 256 or more.
    pub fn wrap_range(bytes: &'a [u8], offset: usize, length: usize) -> Result<Opcode<'a>> {
        if length > MAX_OPCODE_LENGTH {
            return Err(Error::OpcodeTooLong(length));
        }

        let end = offset.checked_add(length).ok_or(Error::OutOfBounds)?;
        let view = bytes.get(offset..end).ok_or(Error::OutOfBounds)?;

        Self::wrap(view)
    }

    /// Returns the byte at position `index`, if any.
    #[must_use]
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Returns the length of the opcode in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for the zero length opcode.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the opcode bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the opcode bytes into a new vector.
    #[must_use]
    pub fn to_owned_bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Detaches the opcode from the buffer it borrows from.
    #[must_use]
    pub fn into_owned(self) -> Opcode<'static> {
        Opcode {
            bytes: Cow::Owned(self.bytes.into_owned()),
        }
    }

    /// Encodes the opcode into a fixed-size field of `width` bytes.
    ///
    /// The layout is `[length][opcode bytes][zero padding]`, so a shorter opcode's padding is
    /// never mistaken for opcode bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OpcodeWidth`] if `length >= width`.
    pub fn encode(&self, width: usize) -> Result<Vec<u8>> {
        let mut field = vec![0_u8; width];
        self.encode_into(&mut field)?;
        Ok(field)
    }

    /// Encodes the opcode into `field`, using the full length of `field` as the width.
    ///
    /// # Errors
    /// Returns [`crate::Error::OpcodeWidth`] if the opcode does not fit.
    pub fn encode_into(&self, field: &mut [u8]) -> Result<()> {
        let length = self.len();
        if length >= field.len() {
            return Err(Error::OpcodeWidth {
                length,
                width: field.len(),
            });
        }

        field[0] = u8::try_from(length).map_err(|_| Error::OpcodeTooLong(length))?;
        field[1..=length].copy_from_slice(&self.bytes);
        field[length + 1..].fill(0);
        Ok(())
    }

    /// Decodes an opcode from its fixed-size field encoding, borrowing from `field`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `field` is empty or shorter than the length
    /// byte announces.
    pub fn decode(field: &'a [u8]) -> Result<Opcode<'a>> {
        let length = *field.first().ok_or(Error::OutOfBounds)? as usize;
        Self::wrap_range(field, 1, length)
    }
}

impl Opcode<'static> {
    /// Takes ownership of `bytes` as an opcode.
    ///
    /// # Errors
    /// Returns [`crate::Error::OpcodeTooLong`] if `bytes` is longer than 255 bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Result<Opcode<'static>> {
        if bytes.len() > MAX_OPCODE_LENGTH {
            return Err(Error::OpcodeTooLong(bytes.len()));
        }

        Ok(Opcode {
            bytes: Cow::Owned(bytes),
        })
    }

    /// Parses the human-readable form: space separated hex byte pairs, e.g. `"0F 1F 00"`.
    ///
    /// Both upper and lower case digits are accepted. An empty string is the empty opcode.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for tokens that are not exactly two hex digits and
    /// [`crate::Error::OpcodeTooLong`] for more than 255 bytes.
    pub fn parse(text: &str) -> Result<Opcode<'static>> {
        let bytes = text
            .split_whitespace()
            .map(|pair| {
                if pair.len() != 2 {
                    return Err(malformed_error!("Invalid opcode byte '{}' in '{}'", pair, text));
                }
                u8::from_str_radix(pair, 16)
                    .map_err(|_| malformed_error!("Invalid opcode byte '{}' in '{}'", pair, text))
            })
            .collect::<Result<Vec<u8>>>()?;

        Self::from_vec(bytes)
    }
}

impl FromStr for Opcode<'static> {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Opcode::parse(s)
    }
}

impl<'a, 'b> PartialEq<Opcode<'b>> for Opcode<'a> {
    fn eq(&self, other: &Opcode<'b>) -> bool {
        self.bytes.as_ref() == other.bytes.as_ref()
    }
}

impl Eq for Opcode<'_> {}

impl<'a, 'b> PartialOrd<Opcode<'b>> for Opcode<'a> {
    fn partial_cmp(&self, other: &Opcode<'b>) -> Option<Ordering> {
        Some(compare(self.as_bytes(), other.as_bytes()))
    }
}

impl Ord for Opcode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.as_bytes(), other.as_bytes())
    }
}

/// Orders byte sequences by length, then by unsigned byte value.
pub(crate) fn compare(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl fmt::Display for Opcode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.bytes.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Opcode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({self})")
    }
}
