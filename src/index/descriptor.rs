//! Instruction descriptor seams.
//!
//! An opcode table is generic over the descriptors a disassembler registers. The index only
//! stores their serialized bytes; a [`DescriptorFactory`] turns those bytes back into a
//! descriptor on lookup and supplies the placeholder for unrecognized byte runs.

use std::io::Write;

use crate::{
    buffer::{decode::DecodeBuffer, encode::EncodeBuffer},
    file::parser::Parser,
    opcode::Opcode,
    Result,
};

/// The per-opcode decoding logic registered by a disassembler.
pub trait InstructionDescriptor {
    /// Serializes the descriptor into the index payload area.
    ///
    /// Must write the same bytes every time it is called.
    ///
    /// # Errors
    /// Propagates failures of `writer`.
    fn save(&self, writer: &mut dyn Write) -> Result<()>;

    /// Decodes the operands following `opcode` from `input` and renders the instruction.
    ///
    /// The opcode bytes have already been consumed from `input` when this is called.
    ///
    /// # Errors
    /// Returns any decode failure; the caller decides whether output is kept.
    fn decode(
        &self,
        opcode: &Opcode<'_>,
        input: &mut DecodeBuffer<'_>,
        output: &mut EncodeBuffer<'_>,
    ) -> Result<()>;
}

/// Deserializes stored descriptors for an [`crate::Index`].
pub trait DescriptorFactory {
    /// The descriptor type produced by this factory
    type Descriptor;

    /// Loads the descriptor stored for `opcode`.
    ///
    /// `parser` covers exactly the bytes the builder wrote for this opcode.
    ///
    /// # Errors
    /// Returns a format error for malformed descriptor bytes; the index tags it with the
    /// opcode.
    fn load(&self, opcode: &Opcode<'_>, parser: &mut Parser<'_>) -> Result<Self::Descriptor>;

    /// Creates the placeholder descriptor for a run of unrecognized `bytes`.
    fn unknown(&self, bytes: &[u8]) -> Self::Descriptor;
}
