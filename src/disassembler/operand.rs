//! Operand kinds of the stock instruction set.
//!
//! Operand lists are written in reference tables as space separated tokens, e.g.
//! `"u8 rel16"`. Each token selects one [`OperandKind`]; the persisted form is the
//! kind's `repr` byte.

use std::str::FromStr;

use strum::{EnumCount, EnumIter, FromRepr};

use crate::{
    buffer::{decode::DecodeBuffer, encode::EncodeBuffer},
    context::active_decoder_as,
    disassembler::{decoder::TableDecoder, label},
    Result,
};

/// A single operand of a stock instruction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    FromRepr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum OperandKind {
    /// Unsigned 8 bit immediate
    U8 = 0x01,
    /// Signed 8 bit immediate
    I8 = 0x02,
    /// Unsigned 16 bit immediate
    U16 = 0x03,
    /// Signed 16 bit immediate
    I16 = 0x04,
    /// Unsigned 32 bit immediate
    U32 = 0x05,
    /// Signed 32 bit immediate
    I32 = 0x06,
    /// Unsigned 64 bit immediate
    U64 = 0x07,
    /// Signed 64 bit immediate
    I64 = 0x08,
    /// 32 bit float immediate
    F32 = 0x09,
    /// 64 bit float immediate
    F64 = 0x0A,
    /// 8 bit index into the decoder's symbol table
    Sym8 = 0x10,
    /// 16 bit index into the decoder's symbol table
    Sym16 = 0x11,
    /// 32 bit index into the decoder's symbol table
    Sym32 = 0x12,
    /// 8 bit branch offset relative to the instruction start
    Rel8 = 0x20,
    /// 16 bit branch offset relative to the instruction start
    Rel16 = 0x21,
    /// 32 bit branch offset relative to the instruction start
    Rel32 = 0x22,
    /// Jump table: an `i32` count followed by that many 32 bit relative offsets
    Table32 = 0x30,
}

impl OperandKind {
    /// The persisted tag of this kind.
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parses a whitespace separated operand list; `-` or an empty string is no operand.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown tokens.
    pub fn parse_list(text: &str) -> Result<Vec<OperandKind>> {
        text.split_whitespace()
            .filter(|token| *token != "-")
            .map(|token| {
                OperandKind::from_str(&token.to_ascii_lowercase())
                    .map_err(|_| malformed_error!("Unknown operand kind '{}'", token))
            })
            .collect()
    }

    /// Decodes one operand of this kind from `input` and renders it.
    ///
    /// `start` is the stream offset of the instruction, the base of relative branches.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input,
    /// [`crate::Error::UnknownSymbol`] for unresolvable symbol indexes and
    /// [`crate::Error::Malformed`] for branch targets outside the address space.
    pub fn decode(
        self,
        start: u64,
        input: &mut DecodeBuffer<'_>,
        output: &mut EncodeBuffer<'_>,
    ) -> Result<()> {
        match self {
            OperandKind::U8 => output.print_value(format!("{:#x}", input.decode_u8()?)),
            OperandKind::I8 => output.print_value(input.decode_i8()?),
            OperandKind::U16 => output.print_value(format!("{:#x}", input.decode_u16()?)),
            OperandKind::I16 => output.print_value(input.decode_i16()?),
            OperandKind::U32 => output.print_value(format!("{:#x}", input.decode_u32()?)),
            OperandKind::I32 => output.print_value(input.decode_i32()?),
            OperandKind::U64 => output.print_value(format!("{:#x}", input.decode_u64()?)),
            OperandKind::I64 => output.print_value(input.decode_i64()?),
            OperandKind::F32 => output.print_value(input.decode_f32()?),
            OperandKind::F64 => output.print_value(input.decode_f64()?),
            OperandKind::Sym8 => symbol(u64::from(input.decode_u8()?), output),
            OperandKind::Sym16 => symbol(u64::from(input.decode_u16()?), output),
            OperandKind::Sym32 => symbol(u64::from(input.decode_u32()?), output),
            OperandKind::Rel8 => branch(start, i64::from(input.decode_i8()?), output),
            OperandKind::Rel16 => branch(start, i64::from(input.decode_i16()?), output),
            OperandKind::Rel32 => branch(start, i64::from(input.decode_i32()?), output),
            OperandKind::Table32 => {
                let count = input.decode_i32()?;
                if count < 0 {
                    return Err(malformed_error!("Negative jump table size {}", count));
                }

                output.print_operator("[")?;
                for entry in 0..count {
                    if entry > 0 {
                        output.print_operator(", ")?;
                    }
                    branch(start, i64::from(input.decode_i32()?), output)?;
                }
                output.print_operator("]")
            }
        }
    }
}

/// Resolves `index` through the running [`TableDecoder`]'s symbol table.
fn symbol(index: u64, output: &mut EncodeBuffer<'_>) -> Result<()> {
    let decoder = active_decoder_as::<TableDecoder>()?;
    let name = decoder.symbols().resolve(index)?;

    output.print_value(format!("#{index}"))?;
    output.print_comment(format!(" /* {name} */"))
}

fn branch(start: u64, offset: i64, output: &mut EncodeBuffer<'_>) -> Result<()> {
    let target = start.checked_add_signed(offset).ok_or_else(|| {
        malformed_error!("Branch target {:#x}{:+} is out of range", start, offset)
    })?;
    output.print_label(label(target))
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{buffer::sink::Transcript, Error};

    fn render(kind: OperandKind, start: u64, data: &[u8]) -> Result<String> {
        let mut transcript = Transcript::new();
        let mut input = DecodeBuffer::new(data);
        let mut output = EncodeBuffer::new(&mut transcript);
        kind.decode(start, &mut input, &mut output)?;
        drop(output);
        Ok(transcript.pending().text())
    }

    #[test]
    fn tokens_and_tags() {
        for kind in OperandKind::iter() {
            assert_eq!(OperandKind::from_repr(kind.tag()), Some(kind));
            assert_eq!(kind.to_string().parse::<OperandKind>().unwrap(), kind);
        }
        assert_eq!(OperandKind::COUNT, 17);
        assert_eq!(OperandKind::Table32.to_string(), "table32");
        assert_eq!(OperandKind::from_repr(0xFF), None);
    }

    #[test]
    fn parse_operand_lists() {
        assert_eq!(
            OperandKind::parse_list("u8  REL16 sym32").unwrap(),
            vec![OperandKind::U8, OperandKind::Rel16, OperandKind::Sym32]
        );
        assert!(OperandKind::parse_list("-").unwrap().is_empty());
        assert!(OperandKind::parse_list("").unwrap().is_empty());
        assert!(matches!(
            OperandKind::parse_list("u8 u128"),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn immediates() {
        assert_eq!(render(OperandKind::U8, 0, &[0x2A]).unwrap(), "0x2a");
        assert_eq!(render(OperandKind::I8, 0, &[0xFE]).unwrap(), "-2");
        assert_eq!(render(OperandKind::I32, 0, &(-5_i32).to_le_bytes()).unwrap(), "-5");
        assert_eq!(render(OperandKind::F64, 0, &2.5_f64.to_le_bytes()).unwrap(), "2.5");
        assert!(matches!(
            render(OperandKind::U32, 0, &[1, 2]),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn branches() {
        assert_eq!(render(OperandKind::Rel8, 0x10, &[0xFC]).unwrap(), "L000C");
        assert_eq!(
            render(OperandKind::Rel16, 0x10, &0x20_i16.to_le_bytes()).unwrap(),
            "L0030"
        );
        assert!(matches!(
            render(OperandKind::Rel8, 0, &[0x80]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn jump_tables() {
        let mut data = 2_i32.to_le_bytes().to_vec();
        data.extend_from_slice(&4_i32.to_le_bytes());
        data.extend_from_slice(&8_i32.to_le_bytes());
        assert_eq!(
            render(OperandKind::Table32, 0x100, &data).unwrap(),
            "[L0104, L0108]"
        );

        assert!(matches!(
            render(OperandKind::Table32, 0, &(-1_i32).to_le_bytes()),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            render(OperandKind::Table32, 0, &3_i32.to_le_bytes()),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn symbols_need_a_table_decoder() {
        assert!(matches!(
            render(OperandKind::Sym8, 0, &[1]),
            Err(Error::NoActiveDecoder)
        ));
    }
}
