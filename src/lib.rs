// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # opscope
//!
//! A reusable engine for byte-code disassemblers. Built in pure Rust, `opscope` resolves
//! variable-length opcodes through a persisted, binary-searchable index, decodes operands from
//! a transactional input buffer and renders classified output (keywords, values, comments,
//! labels, errors) through a transactional output buffer.
//!
//! ## Features
//!
//! - **📦 Compact opcode indexes** - Sorted entry tables with computed widths, mapped on open
//! - **🔍 Longest-match lookup** - Eager and non-eager matching, bounded runs of unknown bytes
//! - **⏪ Speculative decoding** - Roll back reads and discard output of failed instructions
//! - **🧵 Scoped decoder context** - Operand decoders reach the running decoder directly
//! - **🛡️ Memory safe** - Bounds-checked access to every persisted structure
//!
//! ## Quick Start
//!
//! Add `opscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! opscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust
//! use std::rc::Rc;
//! use opscope::prelude::*;
//!
//! // Compile a reference table into an index
//! let table = "\
//! 00;nop;-
//! 10;bipush;i8
//! A7;goto;rel16
//! ";
//! let mut builder = IndexBuilder::new();
//! for entry in opscope::reference::parse(table)? {
//!     builder.add(entry.opcode.clone(), StockInstruction::from_reference(&entry)?)?;
//! }
//! let index = Index::open(StockFactory, File::from_mem(builder.save_to_vec()?)?)?;
//!
//! // Disassemble a code stream
//! let decoder = Rc::new(TableDecoder::new("demo", index).with_settings(
//!     DecoderSettings::new("demo").with_byte_order(ByteOrder::BigEndian),
//! ));
//! let mut transcript = Transcript::new();
//! decode(&decoder, &[0x10, 0xFF, 0x00, 0xA7, 0xFF, 0xFD][..], &mut transcript)?;
//!
//! assert_eq!(
//!     transcript.texts(),
//!     vec!["L0000: bipush -1", "L0002: nop", "L0003: goto L0000"]
//! );
//! # Ok::<(), opscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ### Core Components
//!
//! - [`Opcode`] - Comparable opcode byte sequences with a fixed-width encoding
//! - [`IndexBuilder`] / [`Index`] - Build, persist, open and query opcode indexes
//! - [`DecodeBuffer`] / [`EncodeBuffer`] - Transactional operand input and classified output
//! - [`MachineCodeDecoder`] / [`decode`] - Top-level decode calls and the active decoder
//!
//! ### Collaborator Surface
//!
//! Disassemblers plug into the engine through two seams:
//!
//! - [`InstructionDescriptor`] - Per-opcode decoding logic, serialized into the index payload
//! - [`DescriptorFactory`] - Loads stored descriptors and creates placeholders for unknown bytes
//!
//! The [`disassembler`] module ships a ready-made instruction set on top of these seams.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Unrecognized bytes are not errors;
//! they are rendered as unknown instructions and decoding continues.
//!
//! ```rust
//! use opscope::{Error, File, Index, StockFactory};
//!
//! match Index::open(StockFactory, File::from_mem(b"MZ\x90\x00".to_vec())?) {
//!     Ok(index) => println!("{} opcodes", index.entry_count()),
//!     Err(Error::MagicMismatch { found, .. }) => println!("Not an index: {}", found),
//!     Err(Error::Malformed { message, .. }) => println!("Damaged index: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! # Ok::<(), opscope::Error>(())
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run index --release
//! ```
//!
//! ### Benchmarks
//!
//! ```bash
//! cargo bench --bench lookup
//! ```

#[macro_use]
pub(crate) mod error;

/// Byte sources, backends and low-level codec helpers.
pub mod file;

/// Opcode byte sequences and their ordering.
pub mod opcode;

/// Transactional decode and encode buffers, and output sinks.
pub mod buffer;

/// Persisted opcode indexes: builder, reader and lookup.
pub mod index;

/// Decoder settings, top-level decode calls and the active decoder binding.
pub mod context;

/// The reference table text format.
pub mod reference;

/// A stock, table-driven disassembler.
pub mod disassembler;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use opscope::prelude::*;
///
/// let opcode = Opcode::parse("0F 05")?;
/// assert_eq!(opcode.len(), 2);
/// # Ok::<(), opscope::Error>(())
/// ```
pub mod prelude;

/// `opscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `opscope` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

pub use buffer::{
    decode::DecodeBuffer,
    encode::{EncodeBuffer, Operation},
    sink::{Channels, OutputKind, Sink, TextSink, Transcript, TranscriptLine},
};
pub use context::{
    active_decoder, active_decoder_as, decode, decode_range, ActiveDecoder, DecoderSettings,
    MachineCodeDecoder,
};
pub use disassembler::{OperandKind, StockFactory, StockInstruction, SymbolTable, TableDecoder};
pub use file::{
    io::{ByteIO, ByteOrder},
    parser::Parser,
    File,
};
pub use index::{
    builder::IndexBuilder,
    config::IndexConfig,
    descriptor::{DescriptorFactory, InstructionDescriptor},
    Index, Lookup,
};
pub use opcode::{Opcode, MAX_OPCODE_LENGTH};
pub use reference::ReferenceEntry;
