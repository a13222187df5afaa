//! Lookup configuration for opened indexes
//!
//! This module provides the knobs that control how an [`crate::Index`] is verified on open
//! and how it resynchronizes when the input contains bytes that match no opcode.

/// Default size of the bounded scan window for unrecognized byte runs.
pub const DEFAULT_UNKNOWN_CHUNK_SIZE: usize = 16;

/// Configuration for index loading and lookup
///
/// The index never treats unrecognized bytes as an error. It scans at most
/// `unknown_chunk_size` bytes for the next recognizable opcode and reports the bytes it
/// skipped as a single unknown instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Upper bound of a single unknown run (default: 16). A value of 0 is treated as 1.
    pub unknown_chunk_size: usize,

    /// Verify on open that the entry table is strictly increasing in opcode order
    /// Duplicate or unsorted entries are reported as malformed data
    pub verify_order: bool,

    /// Default matching mode for decoders driven by the index
    /// Eager lookup prefers the longest opcode matching at the current position
    pub eager: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            unknown_chunk_size: DEFAULT_UNKNOWN_CHUNK_SIZE,
            verify_order: true,
            eager: true,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration that trusts the index file
    ///
    /// Skips the order verification on open, useful for large indexes produced by
    /// [`crate::IndexBuilder`] which always writes sorted tables.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            verify_order: false,
            ..Self::default()
        }
    }

    /// Replaces the unknown run bound.
    #[must_use]
    pub fn with_unknown_chunk_size(mut self, size: usize) -> Self {
        self.unknown_chunk_size = size;
        self
    }

    /// Replaces the default matching mode.
    #[must_use]
    pub fn with_eager(mut self, eager: bool) -> Self {
        self.eager = eager;
        self
    }

    /// The effective unknown run bound, never zero.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.unknown_chunk_size.max(1)
    }
}
