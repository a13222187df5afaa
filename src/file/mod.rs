//! Byte-source plumbing for persisted opcode indexes.
//!
//! This module abstracts over the different places a serialized index can live (a file on disk,
//! a memory buffer) and provides the low-level codec helpers every other layer builds on.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - An opened, read-only index image with random access
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Random-access cursor used to read the index structures
//! - [`crate::file::io`] - Endian-aware primitive conversions
//!
//! ## Backend Implementations
//! - `Physical` - Memory-mapped file backend for disk access
//! - `Memory` - In-memory buffer backend
//!
//! # Examples
//!
//! ```rust
//! use opscope::File;
//!
//! let file = File::from_mem(vec![0x4F, 0x50, 0x49, 0x58])?;
//! assert_eq!(file.len(), 4);
//! assert_eq!(file.data_slice(0, 2)?, b"OP");
//! # Ok::<(), opscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`crate::file::File`] is `Send + Sync`; the payload area of an index can be read from
//! several threads at once because access never mutates a shared cursor.

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::{io::Read, path::Path};

use crate::{Error::Empty, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// The trait provides a common interface for accessing index data regardless of whether
/// it's loaded from a file on disk or from a memory buffer. All implementations must be
/// thread-safe.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// A loaded, read-only index image.
///
/// `File` owns a [`Backend`] and hands out bounds-checked slices of it. It is what
/// [`crate::Index::open`] consumes.
#[derive(Debug)]
pub struct File {
    data: Box<dyn Backend>,
}

impl File {
    /// Memory-maps an index file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened, [`crate::Error::Error`]
    /// if mapping fails and [`crate::Error::Empty`] for an empty file.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Wraps an index that is already loaded into memory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Empty`] if the buffer is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    /// Reads a forward-only source to its end and keeps the bytes in memory.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of `reader` and returns [`crate::Error::Empty`] if it yields no
    /// data.
    pub fn from_reader(mut reader: impl Read) -> Result<File> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Self::from_mem(data)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        Ok(File {
            data: Box::new(data),
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the raw data of the loaded file.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns a slice of the file data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn from_mem_backend() {
        let file = File::from_mem(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(file.len(), 4);
        assert!(!file.is_empty());
        assert_eq!(file.data(), &[1, 2, 3, 4]);
        assert_eq!(file.data_slice(1, 2).unwrap(), &[2, 3]);
        assert!(matches!(file.data_slice(3, 2), Err(Error::OutOfBounds)));
    }

    #[test]
    fn empty_sources_are_rejected() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
        assert!(matches!(
            File::from_reader(std::io::empty()),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn from_reader_backend() {
        let file = File::from_reader(&[9_u8, 8, 7][..]).unwrap();
        assert_eq!(file.data(), &[9, 8, 7]);
    }

    #[test]
    fn file_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<File>();
    }
}
