//! Offline construction of opcode indexes.
//!
//! [`IndexBuilder`] accumulates `(opcode, descriptor)` pairs in opcode order, tracks the
//! encoding widths the table needs and serializes everything in the layout
//! [`crate::Index::open`] reads.
//!
//! # Examples
//!
//! ```rust
//! use opscope::{IndexBuilder, Opcode, StockInstruction};
//!
//! let mut builder = IndexBuilder::new();
//! builder.add(Opcode::parse("90")?, StockInstruction::simple("nop"))?;
//! builder.add(Opcode::parse("0F 0B")?, StockInstruction::simple("ud2"))?;
//!
//! assert_eq!(builder.opcode_field_width(), 4);
//! assert_eq!(builder.position_field_width(), 2);
//!
//! let image = builder.save_to_vec()?;
//! assert_eq!(image.len() as u64, builder.total_size());
//! # Ok::<(), opscope::Error>(())
//! ```

use std::{
    collections::BTreeMap,
    fs,
    io::{self, BufWriter, Write},
    path::Path,
};

use log::debug;

use crate::{
    file::io::write_uint_le_at,
    index::{
        descriptor::InstructionDescriptor,
        header::{
            opcode_field_width, position_field_width, position_value_width, IndexHeader,
            HEADER_SIZE,
        },
    },
    opcode::Opcode,
    Error, Result,
};

/// Accumulates opcode to descriptor mappings and serializes them as an index image.
pub struct IndexBuilder<D> {
    entries: BTreeMap<Opcode<'static>, (D, u64)>,
    payload_size: u64,
}

impl<D: InstructionDescriptor> IndexBuilder<D> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> IndexBuilder<D> {
        IndexBuilder {
            entries: BTreeMap::new(),
            payload_size: 0,
        }
    }

    /// Registers `descriptor` for `opcode`, replacing any earlier registration.
    ///
    /// The descriptor is serialized once to learn its size.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for an empty opcode and propagates serialization
    /// failures of the descriptor.
    pub fn add(&mut self, opcode: Opcode<'_>, descriptor: D) -> Result<()> {
        if opcode.is_empty() {
            return Err(Error::Empty);
        }

        let mut counter = CountingWriter::new(io::sink());
        descriptor.save(&mut counter)?;
        let size = counter.written();

        if let Some((_, previous)) = self.entries.insert(opcode.into_owned(), (descriptor, size)) {
            self.payload_size -= previous;
        }
        self.payload_size += size;

        Ok(())
    }

    /// Number of registered opcodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no opcode is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the descriptor registered for `opcode`.
    #[must_use]
    pub fn get(&self, opcode: &Opcode<'_>) -> Option<&D> {
        self.entries
            .get(&opcode.clone().into_owned())
            .map(|(descriptor, _)| descriptor)
    }

    /// Length of the longest registered opcode.
    #[must_use]
    pub fn max_opcode_length(&self) -> usize {
        // Opcodes sort by length first, the last key is always the longest.
        self.entries.keys().next_back().map_or(0, Opcode::len)
    }

    /// Sum of the serialized sizes of all registered descriptors.
    #[must_use]
    pub fn total_payload_size(&self) -> u64 {
        self.payload_size
    }

    /// Width of each encoded opcode field.
    #[must_use]
    pub fn opcode_field_width(&self) -> usize {
        opcode_field_width(self.max_opcode_length())
    }

    /// Width of each encoded payload position.
    ///
    /// Follows the payload size, widened when a trailing empty descriptor sits exactly at the
    /// end of a payload that fills the narrower width.
    #[must_use]
    pub fn position_field_width(&self) -> usize {
        let last_size = self.entries.values().next_back().map_or(0, |(_, size)| *size);
        let last_position = self.payload_size - last_size;
        position_field_width(self.payload_size).max(position_value_width(last_position))
    }

    /// Size of the image [`IndexBuilder::save`] produces.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        let entry_size = (self.opcode_field_width() + self.position_field_width()) as u64;
        HEADER_SIZE as u64 + entry_size * self.entries.len() as u64 + self.payload_size
    }

    /// Writes the header, the sorted entry table and the payload area to `writer`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::DescriptorSize`] if a descriptor writes a different number of
    /// bytes than it did when it was added, and propagates failures of `writer`.
    pub fn save(&self, writer: &mut dyn Write) -> Result<u64> {
        let opcode_width = self.opcode_field_width();
        let position_width = self.position_field_width();

        let header = IndexHeader {
            entry_count: u32::try_from(self.entries.len())
                .map_err(|_| malformed_error!("Too many entries - {}", self.entries.len()))?,
            opcode_width: u16::try_from(opcode_width)
                .map_err(|_| malformed_error!("Opcode field width {} too large", opcode_width))?,
            position_width: u8::try_from(position_width)
                .map_err(|_| malformed_error!("Invalid position width {}", position_width))?,
        };

        let mut output = CountingWriter::new(writer);
        header.write(&mut output)?;

        let mut field = vec![0_u8; opcode_width + position_width];
        let mut position = 0_u64;
        for (opcode, (_, size)) in &self.entries {
            let (opcode_field, position_field) = field.split_at_mut(opcode_width);
            opcode.encode_into(opcode_field)?;

            let mut offset = 0;
            write_uint_le_at(position_field, &mut offset, position_width, position)?;

            output.write_all(&field)?;
            position += size;
        }

        for (opcode, (descriptor, declared)) in &self.entries {
            let before = output.written();
            descriptor.save(&mut output)?;

            let written = output.written() - before;
            if written != *declared {
                return Err(Error::DescriptorSize {
                    opcode: opcode.to_string(),
                    declared: *declared,
                    written,
                });
            }
        }

        output.flush()?;

        debug!(
            "saved index: {} entries, opcode width {}, position width {}, payload {} bytes",
            self.entries.len(),
            opcode_width,
            position_width,
            self.payload_size
        );

        Ok(output.written())
    }

    /// Serializes the index into a new buffer.
    ///
    /// # Errors
    /// See [`IndexBuilder::save`].
    pub fn save_to_vec(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(usize::try_from(self.total_size()).unwrap_or(0));
        self.save(&mut data)?;
        Ok(data)
    }

    /// Serializes the index into the file at `path`, replacing its contents.
    ///
    /// # Errors
    /// See [`IndexBuilder::save`]; also propagates failures to create the file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<u64> {
        let mut writer = BufWriter::new(fs::File::create(path)?);
        let written = self.save(&mut writer)?;
        writer.flush()?;
        Ok(written)
    }
}

impl<D: InstructionDescriptor> Default for IndexBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for IndexBuilder<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("entries", &self.entries.len())
            .field("payload_size", &self.payload_size)
            .finish()
    }
}

/// A writer that counts the bytes passed through it.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        CountingWriter { inner, written: 0 }
    }

    fn written(&self) -> u64 {
        self.written
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.inner.write(buf)?;
        self.written += count as u64;
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        buffer::{decode::DecodeBuffer, encode::EncodeBuffer},
        file::io::read_uint_le_at,
    };

    struct Blob(Vec<u8>);

    impl InstructionDescriptor for Blob {
        fn save(&self, writer: &mut dyn Write) -> Result<()> {
            writer.write_all(&self.0)?;
            Ok(())
        }

        fn decode(
            &self,
            _opcode: &Opcode<'_>,
            _input: &mut DecodeBuffer<'_>,
            _output: &mut EncodeBuffer<'_>,
        ) -> Result<()> {
            Ok(())
        }
    }

    /// Writes one more byte on every call.
    struct Growing(Cell<usize>);

    impl InstructionDescriptor for Growing {
        fn save(&self, writer: &mut dyn Write) -> Result<()> {
            let size = self.0.get();
            self.0.set(size + 1);
            writer.write_all(&vec![0; size])?;
            Ok(())
        }

        fn decode(
            &self,
            _opcode: &Opcode<'_>,
            _input: &mut DecodeBuffer<'_>,
            _output: &mut EncodeBuffer<'_>,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn op(text: &str) -> Opcode<'static> {
        Opcode::parse(text).unwrap()
    }

    #[test]
    fn empty_builder() {
        let builder: IndexBuilder<Blob> = IndexBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.opcode_field_width(), 2);
        assert_eq!(builder.position_field_width(), 2);

        let image = builder.save_to_vec().unwrap();
        assert_eq!(image.len(), HEADER_SIZE);
    }

    #[test]
    fn replace_keeps_size_accounting() {
        let mut builder = IndexBuilder::new();
        builder.add(op("01"), Blob(vec![1, 2, 3])).unwrap();
        builder.add(op("02 03"), Blob(vec![4])).unwrap();
        assert_eq!(builder.total_payload_size(), 4);

        builder.add(op("01"), Blob(vec![9])).unwrap();
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.total_payload_size(), 2);
        assert_eq!(builder.get(&op("01")).unwrap().0, vec![9]);
        assert_eq!(builder.max_opcode_length(), 2);
    }

    #[test]
    fn rejects_empty_opcode() {
        let mut builder = IndexBuilder::new();
        assert!(matches!(
            builder.add(op(""), Blob(vec![])),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn layout_is_sorted_with_cumulative_positions() {
        let mut builder = IndexBuilder::new();
        builder.add(op("02 01"), Blob(vec![0xC0])).unwrap();
        builder.add(op("FF"), Blob(vec![0xA0, 0xA1])).unwrap();
        builder.add(op("01"), Blob(vec![0xB0, 0xB1, 0xB2])).unwrap();

        let image = builder.save_to_vec().unwrap();
        assert_eq!(image.len() as u64, builder.total_size());

        let header = IndexHeader::read(&image).unwrap();
        assert_eq!(header.entry_count, 3);
        assert_eq!(header.opcode_width, 4);
        assert_eq!(header.position_width, 2);

        let table = &image[HEADER_SIZE..HEADER_SIZE + 18];
        let mut positions = Vec::new();
        let mut opcodes = Vec::new();
        for entry in table.chunks(6) {
            opcodes.push(Opcode::decode(&entry[..4]).unwrap().to_string());
            let mut offset = 4;
            positions.push(read_uint_le_at(entry, &mut offset, 2).unwrap());
        }
        assert_eq!(opcodes, ["01", "FF", "02 01"]);
        assert_eq!(positions, [0, 3, 5]);
        assert_eq!(
            &image[HEADER_SIZE + 18..],
            &[0xB0, 0xB1, 0xB2, 0xA0, 0xA1, 0xC0]
        );
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut builder = IndexBuilder::new();
        builder.add(op("0A"), Growing(Cell::new(1))).unwrap();

        match builder.save_to_vec() {
            Err(Error::DescriptorSize {
                opcode,
                declared,
                written,
            }) => {
                assert_eq!(opcode, "0A");
                assert_eq!(declared, 1);
                assert_eq!(written, 2);
            }
            other => panic!("unexpected {:?}", other.map(|data| data.len())),
        }
    }

    #[test]
    fn wide_positions() {
        let mut builder = IndexBuilder::new();
        builder.add(op("00"), Blob(vec![0; 70_000])).unwrap();
        builder.add(op("01"), Blob(vec![1])).unwrap();
        assert_eq!(builder.position_field_width(), 4);

        let image = builder.save_to_vec().unwrap();
        let mut offset = HEADER_SIZE + 2 + 4 + 2;
        assert_eq!(read_uint_le_at(&image, &mut offset, 4).unwrap(), 70_000);
    }

    #[test]
    fn empty_descriptor_at_the_payload_end_widens_positions() {
        let mut builder = IndexBuilder::new();
        builder.add(op("00"), Blob(vec![0; 65_536])).unwrap();
        assert_eq!(builder.position_field_width(), 2);

        builder.add(op("01"), Blob(Vec::new())).unwrap();
        assert_eq!(builder.total_payload_size(), 65_536);
        assert_eq!(builder.position_field_width(), 4);

        let image = builder.save_to_vec().unwrap();
        assert_eq!(image.len() as u64, builder.total_size());
        let mut offset = HEADER_SIZE + 2 + 4 + 2;
        assert_eq!(read_uint_le_at(&image, &mut offset, 4).unwrap(), 65_536);
    }
}
