//! Physical file backend for memory-mapped I/O.
//!
//! [`crate::file::physical::Physical`] maps an index file directly into the process's virtual
//! address space, so opening a large index only pages in the regions a lookup touches. The
//! sorted entry table is loaded eagerly by [`crate::Index::open`]; the payload area of
//! serialized descriptors stays mapped and is sliced on demand.

use super::Backend;
use crate::{
    Error::{Error, FileError, OutOfBounds},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that uses memory-mapped I/O for efficient access to files on disk.
///
/// All access operations include bounds checking to ensure memory safety.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// The file is mapped read-only.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        // Index files are written once by the builder and treated as immutable afterwards.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, path::PathBuf};

    use super::*;

    #[test]
    fn physical() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0x4F, 0x50, 0x49, 0x58, 0x01, 0x02, 0x03])
            .unwrap();
        temp.flush().unwrap();

        let physical = Physical::new(temp.path()).unwrap();

        assert_eq!(physical.len(), 7);
        assert_eq!(physical.data()[0], 0x4F);
        assert_eq!(physical.data_slice(4, 3).unwrap(), &[0x01, 0x02, 0x03]);

        if physical
            .data_slice(u32::MAX as usize, u32::MAX as usize)
            .is_ok()
        {
            panic!("This should not work!")
        }

        if physical.data_slice(0, 8).is_ok() {
            panic!("This should not work!")
        }
    }

    #[test]
    fn invalid_file_path_is_rejected() {
        let result = Physical::new(PathBuf::from("/nonexistent/path/to/file.opix"));
        assert!(result.is_err());
        match result.unwrap_err() {
            FileError(io_error) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }

    #[test]
    fn physical_boundary_conditions() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&[0xAA; 32]).unwrap();
        temp.flush().unwrap();

        let physical = Physical::new(temp.path()).unwrap();
        let len = physical.len();

        assert_eq!(physical.data_slice(len - 1, 1).unwrap().len(), 1);
        assert_eq!(physical.data_slice(0, len).unwrap().len(), len);
        assert_eq!(physical.data_slice(len, 0).unwrap().len(), 0);

        assert!(matches!(
            physical.data_slice(usize::MAX, 1),
            Err(crate::Error::OutOfBounds)
        ));
        assert!(matches!(
            physical.data_slice(len - 1, 2),
            Err(crate::Error::OutOfBounds)
        ));
    }
}
