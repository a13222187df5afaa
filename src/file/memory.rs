use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Index image backed by an owned buffer, e.g. one produced by
/// [`crate::IndexBuilder::save_to_vec`] or embedded with `include_bytes!`.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The serialized index to consume
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(OutOfBounds)?;
        self.data.get(offset..end).ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slices() {
        let mut data = vec![0x00_u8; 64];
        data[12..16].copy_from_slice(&[0x10, 0x20, 0x30, 0x40]);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 64);
        assert_eq!(memory.data_slice(12, 4).unwrap(), &[0x10, 0x20, 0x30, 0x40]);
        assert_eq!(memory.data_slice(64, 0).unwrap(), &[] as &[u8]);
        assert!(matches!(memory.data_slice(64, 1), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(60, 5), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(usize::MAX, 2), Err(OutOfBounds)));
    }

    #[test]
    fn memory_empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        assert_eq!(memory.data_slice(0, 0).unwrap(), &[] as &[u8]);
    }
}
