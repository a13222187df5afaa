//! Stock instruction descriptors and their factory.
//!
//! Persisted layout of a [`StockInstruction`]:
//!
//! | Variant    | Layout                                                    |
//! |------------|-----------------------------------------------------------|
//! | `Simple`   | `0x01`, mnemonic                                          |
//! | `Operands` | `0x02`, mnemonic, operand count (`u8`), one tag per operand |
//!
//! Mnemonics are 7-bit length prefixed UTF-8. `Unknown` is only created for unrecognized
//! byte runs and is never persisted.

use std::io::Write;

use crate::{
    buffer::{decode::DecodeBuffer, encode::EncodeBuffer},
    disassembler::operand::OperandKind,
    file::{io::write_prefixed_string_utf8, parser::Parser},
    index::descriptor::{DescriptorFactory, InstructionDescriptor},
    opcode::Opcode,
    reference::ReferenceEntry,
    Result,
};

const TAG_SIMPLE: u8 = 0x01;
const TAG_OPERANDS: u8 = 0x02;

/// A descriptor of the stock, table-driven instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockInstruction {
    /// An instruction without operands
    Simple {
        /// The instruction's mnemonic
        mnemonic: String,
    },
    /// An instruction followed by a fixed list of operands
    Operands {
        /// The instruction's mnemonic
        mnemonic: String,
        /// The operands in stream order
        operands: Vec<OperandKind>,
    },
    /// A run of bytes that matched no opcode
    Unknown {
        /// The unrecognized bytes
        bytes: Vec<u8>,
    },
}

impl StockInstruction {
    /// An instruction without operands.
    pub fn simple(mnemonic: impl Into<String>) -> StockInstruction {
        StockInstruction::Simple {
            mnemonic: mnemonic.into(),
        }
    }

    /// An instruction with `operands`; an empty list yields [`StockInstruction::Simple`].
    pub fn with_operands(
        mnemonic: impl Into<String>,
        operands: Vec<OperandKind>,
    ) -> StockInstruction {
        if operands.is_empty() {
            return Self::simple(mnemonic);
        }

        StockInstruction::Operands {
            mnemonic: mnemonic.into(),
            operands,
        }
    }

    /// Builds the descriptor of a reference table entry.
    ///
    /// The first extra field holds the operand list, e.g. `u8 rel16`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown operand tokens.
    pub fn from_reference(entry: &ReferenceEntry) -> Result<StockInstruction> {
        let operands = match entry.field(0) {
            Some(list) => OperandKind::parse_list(list).map_err(|error| {
                malformed_error!("Operands of [{}] {} - {}", entry.opcode, entry.mnemonic, error)
            })?,
            None => Vec::new(),
        };

        Ok(Self::with_operands(entry.mnemonic.clone(), operands))
    }

    /// The mnemonic, `None` for unknown runs.
    #[must_use]
    pub fn mnemonic(&self) -> Option<&str> {
        match self {
            StockInstruction::Simple { mnemonic } | StockInstruction::Operands { mnemonic, .. } => {
                Some(mnemonic.as_str())
            }
            StockInstruction::Unknown { .. } => None,
        }
    }

    /// The operands, empty for operandless instructions and unknown runs.
    #[must_use]
    pub fn operands(&self) -> &[OperandKind] {
        match self {
            StockInstruction::Operands { operands, .. } => operands.as_slice(),
            _ => &[],
        }
    }

    /// Returns `true` for unknown runs.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, StockInstruction::Unknown { .. })
    }
}

impl InstructionDescriptor for StockInstruction {
    fn save(&self, writer: &mut dyn Write) -> Result<()> {
        match self {
            StockInstruction::Simple { mnemonic } => {
                writer.write_all(&[TAG_SIMPLE])?;
                write_prefixed_string_utf8(writer, mnemonic)
            }
            StockInstruction::Operands { mnemonic, operands } => {
                let count = u8::try_from(operands.len()).map_err(|_| {
                    malformed_error!(
                        "{} has {} operands, at most 255 are supported",
                        mnemonic,
                        operands.len()
                    )
                })?;

                writer.write_all(&[TAG_OPERANDS])?;
                write_prefixed_string_utf8(writer, mnemonic)?;
                writer.write_all(&[count])?;
                for operand in operands {
                    writer.write_all(&[operand.tag()])?;
                }
                Ok(())
            }
            StockInstruction::Unknown { .. } => {
                Err(malformed_error!("Unknown instructions can not be persisted"))
            }
        }
    }

    fn decode(
        &self,
        opcode: &Opcode<'_>,
        input: &mut DecodeBuffer<'_>,
        output: &mut EncodeBuffer<'_>,
    ) -> Result<()> {
        match self {
            StockInstruction::Simple { mnemonic } => output.print_keyword(mnemonic)?,
            StockInstruction::Operands { mnemonic, operands } => {
                let start = input.total_read() - opcode.len() as u64;

                output.print_keyword(mnemonic)?;
                for (position, operand) in operands.iter().enumerate() {
                    if position == 0 {
                        output.print_plain(" ")?;
                    } else {
                        output.print_operator(", ")?;
                    }
                    operand.decode(start, input, output)?;
                }
            }
            StockInstruction::Unknown { bytes } => {
                let rendered: Vec<String> =
                    bytes.iter().map(|byte| format!("{byte:02X}")).collect();
                output.print_error(format!(".byte {}", rendered.join(" ")))?;
            }
        }

        output.newline()
    }
}

/// Loads [`StockInstruction`]s from an index payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockFactory;

impl DescriptorFactory for StockFactory {
    type Descriptor = StockInstruction;

    fn load(&self, _opcode: &Opcode<'_>, parser: &mut Parser<'_>) -> Result<StockInstruction> {
        let tag = parser.read_le::<u8>()?;
        let instruction = match tag {
            TAG_SIMPLE => StockInstruction::Simple {
                mnemonic: parser.read_prefixed_string_utf8()?,
            },
            TAG_OPERANDS => {
                let mnemonic = parser.read_prefixed_string_utf8()?;
                let count = parser.read_le::<u8>()?;

                let mut operands = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    let operand = parser.read_le::<u8>()?;
                    let kind = OperandKind::from_repr(operand)
                        .ok_or_else(|| malformed_error!("Invalid operand tag {:#04x}", operand))?;
                    operands.push(kind);
                }

                StockInstruction::Operands { mnemonic, operands }
            }
            _ => return Err(malformed_error!("Invalid instruction tag {:#04x}", tag)),
        };

        if parser.has_more_data() {
            return Err(malformed_error!(
                "{} trailing bytes after instruction descriptor",
                parser.remaining()
            ));
        }

        Ok(instruction)
    }

    fn unknown(&self, bytes: &[u8]) -> StockInstruction {
        StockInstruction::Unknown {
            bytes: bytes.to_vec(),
        }
    }
}
