//! Persisted opcode indexes and instruction lookup.
//!
//! An index maps variable-length opcode byte sequences to serialized instruction
//! descriptors. It is built offline with [`crate::index::builder::IndexBuilder`] and opened
//! with [`crate::index::Index::open`], which loads the small sorted entry table into memory
//! and leaves the payload area of descriptors in the backing [`crate::File`].
//!
//! # Lookup
//!
//! [`Index::lookup_next_instruction`] resolves the instruction starting at the current
//! position of a [`crate::DecodeBuffer`]:
//!
//! - **Non-eager** lookup accepts only single-byte opcodes.
//! - **Eager** lookup tries every candidate length up to the longest opcode in the table and
//!   keeps the longest match.
//! - Bytes that match nothing start an **unknown run**. The run ends right before the next
//!   position that matches again, or after a bounded number of bytes
//!   ([`crate::index::config::IndexConfig::unknown_chunk_size`]). The run is reported as a
//!   single unknown descriptor created by the [`DescriptorFactory`].
//! - At the end of the stream no instruction is returned.
//!
//! # Examples
//!
//! ```rust
//! use opscope::{DecodeBuffer, File, Index, IndexBuilder, Opcode, StockFactory, StockInstruction};
//!
//! let mut builder = IndexBuilder::new();
//! builder.add(Opcode::parse("01")?, StockInstruction::simple("inc"))?;
//! builder.add(Opcode::parse("01 01")?, StockInstruction::simple("inc2"))?;
//!
//! let index = Index::open(StockFactory, File::from_mem(builder.save_to_vec()?)?)?;
//! let code = [0x01, 0x01, 0x01];
//! let mut input = DecodeBuffer::new(&code[..]);
//!
//! let first = index.lookup_next_instruction(&mut input, true)?.unwrap();
//! assert_eq!(first.len(), 2);
//! let second = index.lookup_next_instruction(&mut input, true)?.unwrap();
//! assert_eq!(second.offset(), 2);
//! assert!(index.lookup_next_instruction(&mut input, true)?.is_none());
//! # Ok::<(), opscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! The entry table is read-only after [`Index::open`] and the payload is accessed through
//! bounds-checked slices of the backing file, so an `Index` with a `Send + Sync` factory can
//! serve lookups from several threads, each using its own [`crate::DecodeBuffer`].

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod header;

use std::fmt;

use log::{debug, trace, warn};

use crate::{
    buffer::decode::DecodeBuffer,
    file::{io::read_uint_le_at, parser::Parser, File},
    opcode::{compare, Opcode},
    Error, Result,
};
use config::IndexConfig;
use descriptor::DescriptorFactory;
use header::{IndexHeader, HEADER_SIZE};

/// One loaded `(opcode, position)` pair of the entry table.
#[derive(Debug, Clone)]
struct Entry {
    opcode: Opcode<'static>,
    /// Offset of the descriptor inside the payload area
    position: u64,
}

/// The result of a successful lookup.
///
/// Holds the consumed opcode bytes (or the bytes of an unknown run) and the resolved
/// descriptor.
#[derive(Debug, Clone)]
pub struct Lookup<D> {
    offset: u64,
    bytes: Vec<u8>,
    known: bool,
    descriptor: D,
}

impl<D> Lookup<D> {
    /// Stream offset of the first consumed byte.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes the lookup consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; every lookup consumes at least one byte.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The consumed bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The matched opcode, `None` for an unknown run.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode<'_>> {
        if self.known {
            Opcode::wrap(&self.bytes).ok()
        } else {
            None
        }
    }

    /// Returns `true` if the bytes matched a table entry.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.known
    }

    /// The resolved descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Consumes the lookup and returns the descriptor.
    pub fn into_descriptor(self) -> D {
        self.descriptor
    }
}

/// An opened opcode index.
pub struct Index<F: DescriptorFactory> {
    factory: F,
    file: File,
    header: IndexHeader,
    entries: Vec<Entry>,
    payload_start: usize,
    max_opcode_length: usize,
    config: IndexConfig,
}

impl<F: DescriptorFactory> Index<F> {
    /// Opens an index image with the default [`IndexConfig`].
    ///
    /// # Errors
    /// Returns [`crate::Error::MagicMismatch`] for foreign data, and
    /// [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] for a damaged image.
    pub fn open(factory: F, file: File) -> Result<Index<F>> {
        Self::open_with_config(factory, file, IndexConfig::default())
    }

    /// Opens an index image.
    ///
    /// # Errors
    /// See [`Index::open`]. With [`IndexConfig::verify_order`], duplicate or unsorted
    /// entries are reported as [`crate::Error::Malformed`].
    pub fn open_with_config(factory: F, file: File, config: IndexConfig) -> Result<Index<F>> {
        let header = IndexHeader::read(file.data())?;

        let table_size = header.table_size().ok_or(Error::OutOfBounds)?;
        let table = file.data_slice(HEADER_SIZE, table_size)?;
        let payload_start = HEADER_SIZE + table_size;
        let payload_size = (file.len() - payload_start) as u64;

        let opcode_width = usize::from(header.opcode_width);
        let position_width = usize::from(header.position_width);

        let mut entries: Vec<Entry> = Vec::with_capacity(header.entry_count as usize);
        for field in table.chunks_exact(header.entry_size()) {
            let opcode = Opcode::decode(&field[..opcode_width])?;
            if opcode.is_empty() {
                return Err(malformed_error!("Empty opcode at entry {}", entries.len()));
            }

            let mut offset = opcode_width;
            let position = read_uint_le_at(field, &mut offset, position_width)?;
            if position > payload_size {
                return Err(malformed_error!(
                    "Position {:#x} of [{}] lies outside the payload of {} bytes",
                    position,
                    opcode,
                    payload_size
                ));
            }

            if let Some(previous) = entries.last() {
                if position < previous.position {
                    return Err(malformed_error!(
                        "Position of [{}] precedes the position of [{}]",
                        opcode,
                        previous.opcode
                    ));
                }

                if config.verify_order && previous.opcode >= opcode {
                    return Err(malformed_error!(
                        "Entry [{}] is not ordered after [{}]",
                        opcode,
                        previous.opcode
                    ));
                }
            }

            entries.push(Entry {
                opcode: opcode.into_owned(),
                position,
            });
        }

        let max_opcode_length = entries.iter().map(|entry| entry.opcode.len()).max().unwrap_or(0);

        debug!(
            "opened index: {} entries, opcode width {}, position width {}, payload {} bytes",
            entries.len(),
            opcode_width,
            position_width,
            payload_size
        );

        Ok(Index {
            factory,
            file,
            header,
            entries,
            payload_start,
            max_opcode_length,
            config,
        })
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Width of each encoded opcode field.
    #[must_use]
    pub fn opcode_field_width(&self) -> usize {
        usize::from(self.header.opcode_width)
    }

    /// Width of each encoded payload position.
    #[must_use]
    pub fn position_field_width(&self) -> usize {
        usize::from(self.header.position_width)
    }

    /// Length of the longest opcode in the table.
    #[must_use]
    pub fn max_opcode_length(&self) -> usize {
        self.max_opcode_length
    }

    /// The configuration the index was opened with.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The factory used to load descriptors.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Returns `true` if `opcode` has a table entry.
    #[must_use]
    pub fn contains(&self, opcode: &Opcode<'_>) -> bool {
        self.find_index(opcode.as_bytes()).is_some()
    }

    /// All opcodes of the table in table order.
    pub fn opcodes(&self) -> impl Iterator<Item = &Opcode<'static>> + '_ {
        self.entries.iter().map(|entry| &entry.opcode)
    }

    /// Loads the descriptor stored for `opcode`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Descriptor`] if the stored bytes fail to load.
    pub fn descriptor(&self, opcode: &Opcode<'_>) -> Result<Option<F::Descriptor>> {
        match self.find_index(opcode.as_bytes()) {
            Some(entry) => self.load(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves the instruction starting at the current position of `input`.
    ///
    /// Consumes the opcode bytes (or the unknown run) from `input` and returns `None` at the
    /// end of the stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Descriptor`] if the matched entry fails to load and
    /// propagates I/O failures of the source.
    pub fn lookup_next_instruction(
        &self,
        input: &mut DecodeBuffer<'_>,
        eager: bool,
    ) -> Result<Option<Lookup<F::Descriptor>>> {
        let offset = input.total_read();

        let matched = {
            let window = input.peek(self.max_opcode_length.max(1))?;
            if window.is_empty() {
                trace!("lookup at {:#x}: end of stream", offset);
                return Ok(None);
            }
            self.match_at(window, eager)
        };

        if let Some(entry) = matched {
            let bytes = input.decode_bytes(self.entries[entry].opcode.len())?;
            let descriptor = self.load(entry)?;

            trace!("lookup at {:#x}: [{}]", offset, self.entries[entry].opcode);
            return Ok(Some(Lookup {
                offset,
                bytes,
                known: true,
                descriptor,
            }));
        }

        let chunk = self.config.chunk_size();
        let run = {
            let window = input.peek(chunk.saturating_add(self.max_opcode_length))?;
            let mut run = 1;
            while run < chunk.min(window.len()) && self.match_at(&window[run..], eager).is_none() {
                run += 1;
            }
            run.min(window.len())
        };

        let bytes = input.decode_bytes(run)?;
        warn!("unknown run of {} bytes at {:#x}", bytes.len(), offset);

        Ok(Some(Lookup {
            offset,
            descriptor: self.factory.unknown(&bytes),
            bytes,
            known: false,
        }))
    }

    /// Returns the entry matching at the start of `window`.
    fn match_at(&self, window: &[u8], eager: bool) -> Option<usize> {
        if !eager {
            return self.find_index(window.get(..1)?);
        }

        let longest = self.max_opcode_length.min(window.len());
        (1..=longest)
            .rev()
            .find_map(|length| self.find_index(&window[..length]))
    }

    fn find_index(&self, bytes: &[u8]) -> Option<usize> {
        self.entries
            .binary_search_by(|entry| compare(entry.opcode.as_bytes(), bytes))
            .ok()
    }

    /// Loads the descriptor of entry `index`, bounded by the position of the next entry.
    fn load(&self, index: usize) -> Result<F::Descriptor> {
        let entry = &self.entries[index];
        let payload_size = (self.file.len() - self.payload_start) as u64;
        let end = self
            .entries
            .get(index + 1)
            .map_or(payload_size, |next| next.position);

        let tagged = |error: Error| Error::Descriptor {
            opcode: entry.opcode.to_string(),
            source: Box::new(error),
        };

        let start = usize::try_from(entry.position).map_err(|_| tagged(Error::OutOfBounds))?;
        let length = usize::try_from(end - entry.position).map_err(|_| tagged(Error::OutOfBounds))?;
        let data = self
            .file
            .data_slice(self.payload_start + start, length)
            .map_err(tagged)?;

        let mut parser = Parser::new(data);
        self.factory
            .load(&entry.opcode, &mut parser)
            .map_err(tagged)
    }
}

impl<F: DescriptorFactory> fmt::Debug for Index<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("entries", &self.entries.len())
            .field("opcode_width", &self.header.opcode_width)
            .field("position_width", &self.header.position_width)
            .field("max_opcode_length", &self.max_opcode_length)
            .field("config", &self.config)
            .finish()
    }
}
