//! # opscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the opscope library. Import this module to get quick access to everything needed to
//! build an index and run a decoder.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all opscope operations
pub use crate::Error;

/// The result type used throughout opscope
pub use crate::Result;

/// Configuration for index loading and lookup
pub use crate::IndexConfig;

// ================================================================================================
// Opcode Index
// ================================================================================================

/// Opcode byte sequences
pub use crate::Opcode;

/// Index construction, loading and lookup
pub use crate::{Index, IndexBuilder, Lookup};

/// Seams implemented by disassemblers
pub use crate::{DescriptorFactory, InstructionDescriptor};

/// Low-level file parsing utilities
pub use crate::{ByteOrder, File, Parser};

// ================================================================================================
// Buffers and Output
// ================================================================================================

/// Transactional input and output
pub use crate::{DecodeBuffer, EncodeBuffer};

/// Output classification and sinks
pub use crate::{Channels, OutputKind, Sink, TextSink, Transcript};

// ================================================================================================
// Decoder Context
// ================================================================================================

/// Decoders and top-level decode calls
pub use crate::{decode, decode_range, DecoderSettings, MachineCodeDecoder};

/// Access to the running decoder
pub use crate::{active_decoder, active_decoder_as};

// ================================================================================================
// Stock Disassembler
// ================================================================================================

/// The table-driven instruction set
pub use crate::{OperandKind, StockFactory, StockInstruction, SymbolTable, TableDecoder};

/// Reference table entries
pub use crate::ReferenceEntry;
