//! Reference tables: the human-editable source of an opcode index.
//!
//! A reference table lists one instruction per line as semicolon separated fields:
//!
//! ```text
//! # opcode;mnemonic;extra fields...
//! 0F 0B;ud2;-
//! 10;bipush;i8
//! ```
//!
//! The opcode is written as space separated hex byte pairs; an empty field is written as `-`.
//! Blank lines and lines starting with `#` are ignored. [`ReferenceEntry`]'s `Display`
//! produces the canonical form (uppercase hex), so a parsed table can be written back.

use std::{fmt, str::FromStr};

use crate::{opcode::Opcode, Error, Result};

/// Field separator of a reference line
pub const FIELD_SEPARATOR: char = ';';

/// Placeholder for an empty field
pub const EMPTY_FIELD: &str = "-";

/// One line of a reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    /// The instruction's opcode
    pub opcode: Opcode<'static>,
    /// The instruction's mnemonic
    pub mnemonic: String,
    /// Domain specific extra fields, `None` for `-`
    pub fields: Vec<Option<String>>,
}

impl ReferenceEntry {
    /// Creates an entry without extra fields.
    pub fn new(opcode: Opcode<'static>, mnemonic: impl Into<String>) -> ReferenceEntry {
        ReferenceEntry {
            opcode,
            mnemonic: mnemonic.into(),
            fields: Vec::new(),
        }
    }

    /// Returns extra field `index`, `None` if it is missing or empty.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index)?.as_deref()
    }

    /// Parses a single line; `line_number` is used in error messages.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] naming the line for a missing mnemonic or an
    /// invalid opcode.
    pub fn parse_line(line: &str, line_number: usize) -> Result<ReferenceEntry> {
        let mut fields = line.trim().split(FIELD_SEPARATOR).map(str::trim);

        let opcode_text = fields.next().unwrap_or_default();
        let opcode = Opcode::parse(opcode_text).map_err(|error| {
            malformed_error!("Line {}: invalid opcode '{}' - {}", line_number, opcode_text, error)
        })?;
        if opcode.is_empty() {
            return Err(malformed_error!("Line {}: missing opcode", line_number));
        }

        let mnemonic = match fields.next() {
            Some(mnemonic) if !mnemonic.is_empty() && mnemonic != EMPTY_FIELD => mnemonic,
            _ => return Err(malformed_error!("Line {}: missing mnemonic", line_number)),
        };

        let fields = fields
            .map(|field| {
                if field.is_empty() || field == EMPTY_FIELD {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();

        Ok(ReferenceEntry {
            opcode,
            mnemonic: mnemonic.to_string(),
            fields,
        })
    }
}

impl fmt::Display for ReferenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_SEPARATOR}{}", self.opcode, self.mnemonic)?;
        for field in &self.fields {
            write!(f, "{FIELD_SEPARATOR}{}", field.as_deref().unwrap_or(EMPTY_FIELD))?;
        }
        Ok(())
    }
}

impl FromStr for ReferenceEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReferenceEntry::parse_line(s, 1)
    }
}

/// Parses a whole reference table, skipping blank lines and `#` comments.
///
/// # Errors
/// Returns the error of the first malformed line.
pub fn parse(text: &str) -> Result<Vec<ReferenceEntry>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| ReferenceEntry::parse_line(line, index + 1))
        .collect()
}

/// Renders `entries` in canonical form, one per line.
#[must_use]
pub fn format(entries: &[ReferenceEntry]) -> String {
    let mut text = String::new();
    for entry in entries {
        text.push_str(&entry.to_string());
        text.push('\n');
    }
    text
}
