//! Transactional primitive decoding over a forward-only byte source.
//!
//! [`DecodeBuffer`] wraps any [`std::io::Read`] and decodes primitives in a configurable byte
//! order. Every byte pulled from the source lands in an internal look-ahead area first; a
//! speculative cursor walks that area. With auto-commit on (the default) each decode commits
//! immediately. With auto-commit off, decodes only move the cursor: [`DecodeBuffer::commit`]
//! makes them permanent and [`DecodeBuffer::discard`] rewinds the cursor, so the next decode
//! sees the same bytes again without touching the source.
//!
//! # Examples
//!
//! ```rust
//! use opscope::{ByteOrder, DecodeBuffer};
//!
//! let code = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x10, 0x2A];
//! let mut input = DecodeBuffer::with_order(&code[..], ByteOrder::BigEndian);
//! input.decode_magic(0xCAFE_BABE_u32)?;
//!
//! input.set_auto_commit(false);
//! let wide = input.decode::<u16>()?;
//! assert_eq!(wide, 0x0010);
//! input.discard(None);
//! assert_eq!(input.position(), 4);
//!
//! assert_eq!(input.decode::<u8>()?, 0x00);
//! input.commit();
//! assert_eq!(input.position(), 5);
//! # Ok::<(), opscope::Error>(())
//! ```

use std::{
    fmt,
    io::{Cursor, ErrorKind, Read},
};

use crate::{
    file::io::{ByteIO, ByteOrder},
    Error::{self, OutOfBounds},
    Result,
};

/// Upper bound for the look-ahead growth of a single read from the source.
const READ_CHUNK: usize = 4096;

/// A byte-order aware, transactional reader over a forward-only byte source.
///
/// Created per decode invocation and dropped at the end of it.
pub struct DecodeBuffer<'a> {
    source: Box<dyn Read + 'a>,
    order: ByteOrder,
    auto_commit: bool,
    /// Bytes pulled from the source that are not committed yet
    lookahead: Vec<u8>,
    /// Speculative read position inside `lookahead`
    cursor: usize,
    /// Total number of committed bytes
    committed: u64,
    /// Hard window after which the buffer reports end of stream
    limit: Option<u64>,
    exhausted: bool,
}

macro_rules! typed_decoders {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Decodes a `", stringify!($ty), "` in the configured byte order.")]
            ///
            /// # Errors
            /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
            pub fn $name(&mut self) -> Result<$ty> {
                self.decode::<$ty>()
            }
        )*
    };
}

impl<'a> DecodeBuffer<'a> {
    /// Wraps `source` with little-endian byte order and auto-commit on.
    pub fn new(source: impl Read + 'a) -> DecodeBuffer<'a> {
        Self::with_order(source, ByteOrder::LittleEndian)
    }

    /// Wraps `source` with the given byte order and auto-commit on.
    pub fn with_order(source: impl Read + 'a, order: ByteOrder) -> DecodeBuffer<'a> {
        DecodeBuffer {
            source: Box::new(source),
            order,
            auto_commit: true,
            lookahead: Vec::new(),
            cursor: 0,
            committed: 0,
            limit: None,
            exhausted: false,
        }
    }

    /// Bounds the buffer to at most `limit` bytes; beyond that it reports end of stream.
    ///
    /// The source is never read past the limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> DecodeBuffer<'a> {
        self.limit = Some(limit);
        self
    }

    /// Returns the configured byte order.
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Changes the byte order for subsequent decodes.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Returns the decode window, if one was set.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Returns whether decodes commit immediately.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Toggles auto-commit. Switching it back on commits all outstanding speculative bytes.
    pub fn set_auto_commit(&mut self, enabled: bool) {
        if enabled && !self.auto_commit {
            self.commit();
        }
        self.auto_commit = enabled;
    }

    /// Number of bytes committed so far, i.e. the real position in the source stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.committed
    }

    /// Number of bytes decoded so far, including speculative ones that are not committed.
    #[must_use]
    pub fn total_read(&self) -> u64 {
        self.committed + self.cursor as u64
    }

    /// Number of speculative bytes waiting for [`DecodeBuffer::commit`].
    #[must_use]
    pub fn pending(&self) -> usize {
        self.cursor
    }

    /// Makes all speculative decodes permanent.
    pub fn commit(&mut self) {
        if self.cursor == 0 {
            return;
        }

        self.lookahead.drain(..self.cursor);
        self.committed += self.cursor as u64;
        self.cursor = 0;
    }

    /// Drops the last `count` speculative bytes, or all of them for `None`.
    ///
    /// The dropped bytes stay in the look-ahead area and are decoded again by the next call.
    /// Counts larger than the speculative area are clamped.
    pub fn discard(&mut self, count: Option<usize>) {
        let count = count.map_or(self.cursor, |count| count.min(self.cursor));
        self.cursor -= count;
    }

    /// Runs `f` speculatively: commits what it decoded on `Ok`, rewinds on `Err`.
    ///
    /// Speculation that was already outstanding before the call is left untouched.
    ///
    /// # Errors
    /// Returns any error produced by `f`.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let previous = self.auto_commit;
        let start = self.cursor;
        self.auto_commit = false;

        let result = f(self);
        if result.is_err() {
            self.cursor = start.min(self.cursor);
        }

        self.auto_commit = previous;
        if previous {
            self.commit();
        }

        result
    }

    /// Returns up to `max` upcoming bytes without consuming them.
    ///
    /// The returned slice is shorter than `max` only at the end of the stream or window.
    ///
    /// # Errors
    /// Propagates I/O failures of the source.
    pub fn peek(&mut self, max: usize) -> Result<&[u8]> {
        let available = self.fill(max)?.min(max);
        Ok(&self.lookahead[self.cursor..self.cursor + available])
    }

    /// Returns `true` if at least one more byte can be decoded.
    ///
    /// # Errors
    /// Propagates I/O failures of the source.
    pub fn has_remaining(&mut self) -> Result<bool> {
        Ok(self.fill(1)? > 0)
    }

    /// Decodes a `T` in the configured byte order.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early, or propagates I/O
    /// failures of the source.
    pub fn decode<T: ByteIO>(&mut self) -> Result<T> {
        let mut offset = self.take(std::mem::size_of::<T>())?;
        let value = self.order.read_at::<T>(&self.lookahead, &mut offset)?;
        self.settle();
        Ok(value)
    }

    typed_decoders! {
        decode_u8 => u8,
        decode_i8 => i8,
        decode_u16 => u16,
        decode_i16 => i16,
        decode_u32 => u32,
        decode_i32 => i32,
        decode_u64 => u64,
        decode_i64 => i64,
        decode_f32 => f32,
        decode_f64 => f64,
    }

    /// Decodes `count` consecutive values of `T`.
    ///
    /// Either all values are decoded or none is consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
    pub fn decode_array<T: ByteIO>(&mut self, count: usize) -> Result<Vec<T>> {
        let size = std::mem::size_of::<T>()
            .checked_mul(count)
            .ok_or(OutOfBounds)?;
        let mut offset = self.take(size)?;

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.order.read_at::<T>(&self.lookahead, &mut offset)?);
        }

        self.settle();
        Ok(values)
    }

    /// Decodes `count` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
    pub fn decode_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let start = self.take(count)?;
        let bytes = self.lookahead[start..start + count].to_vec();
        self.settle();
        Ok(bytes)
    }

    /// Decodes a value of `expected`'s width and checks it against `expected`.
    ///
    /// This is a one-shot assertion for the start of a stream: on success the magic is
    /// consumed, so a second call sees the following bytes. On mismatch nothing is consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::MagicMismatch`] if the value differs and
    /// [`crate::Error::OutOfBounds`] if the stream is too short.
    pub fn decode_magic<T>(&mut self, expected: T) -> Result<()>
    where
        T: ByteIO + PartialEq + fmt::LowerHex,
    {
        let start = self.take(std::mem::size_of::<T>())?;
        let mut offset = start;
        let found = self.order.read_at::<T>(&self.lookahead, &mut offset)?;

        if found != expected {
            self.cursor = start;
            return Err(Error::MagicMismatch {
                expected: format!("{expected:#x}"),
                found: format!("{found:#x}"),
            });
        }

        self.settle();
        Ok(())
    }

    /// Skips `count` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early. With auto-commit on,
    /// bytes skipped before the failure stay consumed.
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let mut left = count;
        while left > 0 {
            let step = usize::try_from(left).map_or(READ_CHUNK, |left| left.min(READ_CHUNK));
            self.take(step)?;
            self.settle();
            left -= step as u64;
        }
        Ok(())
    }

    /// Consumes the next `count` bytes and returns them as an independent buffer.
    ///
    /// The slice keeps this buffer's byte order. Decoding from it never affects this buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream ends early.
    pub fn slice(&mut self, count: usize) -> Result<DecodeBuffer<'static>> {
        let bytes = self.decode_bytes(count)?;
        let limit = bytes.len() as u64;
        Ok(DecodeBuffer::with_order(Cursor::new(bytes), self.order).with_limit(limit))
    }

    /// Reserves `count` bytes at the cursor and returns their start index in `lookahead`.
    fn take(&mut self, count: usize) -> Result<usize> {
        if self.fill(count)? < count {
            return Err(OutOfBounds);
        }

        let start = self.cursor;
        self.cursor += count;
        Ok(start)
    }

    fn settle(&mut self) {
        if self.auto_commit {
            self.commit();
        }
    }

    /// Pulls bytes from the source until `wanted` bytes are available past the cursor or the
    /// stream (or window) ends. Returns the number of available bytes.
    fn fill(&mut self, wanted: usize) -> Result<usize> {
        let mut available = self.lookahead.len() - self.cursor;

        while available < wanted && !self.exhausted {
            let mut missing = wanted - available;

            if let Some(limit) = self.limit {
                let pulled = self.committed + self.lookahead.len() as u64;
                let room = limit.saturating_sub(pulled);
                if room == 0 {
                    self.exhausted = true;
                    break;
                }
                missing = usize::try_from(room).map_or(missing, |room| missing.min(room));
            }

            let start = self.lookahead.len();
            self.lookahead.resize(start + missing.min(READ_CHUNK), 0);

            match self.source.read(&mut self.lookahead[start..]) {
                Ok(0) => {
                    self.lookahead.truncate(start);
                    self.exhausted = true;
                }
                Ok(read) => {
                    self.lookahead.truncate(start + read);
                    available += read;
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => {
                    self.lookahead.truncate(start);
                }
                Err(error) => {
                    self.lookahead.truncate(start);
                    return Err(error.into());
                }
            }
        }

        Ok(available)
    }
}

impl fmt::Debug for DecodeBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeBuffer")
            .field("order", &self.order)
            .field("auto_commit", &self.auto_commit)
            .field("committed", &self.committed)
            .field("pending", &self.cursor)
            .field("buffered", &self.lookahead.len())
            .field("limit", &self.limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A source that hands out one byte per read call and counts how much was pulled.
    struct Trickle<'d> {
        data: &'d [u8],
        pulled: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.data = rest;
                    self.pulled.set(self.pulled.get() + 1);
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn decode_primitives_little_endian() {
        let mut data = vec![0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        data.extend_from_slice(&(-7_i64).to_le_bytes());
        data.extend_from_slice(&0.5_f32.to_le_bytes());
        data.extend_from_slice(&1.25_f64.to_le_bytes());

        let mut input = DecodeBuffer::new(&data[..]);
        assert_eq!(input.decode_u8().unwrap(), 0x01);
        assert_eq!(input.decode_u16().unwrap(), 0x1234);
        assert_eq!(input.decode_u32().unwrap(), 0x1234_5678);
        assert_eq!(input.decode_i64().unwrap(), -7);
        assert_eq!(input.decode_f32().unwrap(), 0.5);
        assert_eq!(input.decode_f64().unwrap(), 1.25);
        assert_eq!(input.position(), data.len() as u64);
        assert!(!input.has_remaining().unwrap());
        assert!(matches!(input.decode_u8(), Err(Error::OutOfBounds)));
    }

    #[test]
    fn decode_primitives_big_endian() {
        let data = [0x12, 0x34, 0xFF, 0xFE, 0x00, 0x01, 0x00, 0x02];
        let mut input = DecodeBuffer::with_order(&data[..], ByteOrder::BigEndian);
        assert_eq!(input.decode_u16().unwrap(), 0x1234);
        assert_eq!(input.decode_i16().unwrap(), -2);
        assert_eq!(input.decode_array::<u16>(2).unwrap(), vec![1, 2]);
        assert_eq!(input.total_read(), 8);
    }

    #[test]
    fn discard_restores_position() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut input = DecodeBuffer::new(&data[..]);
        input.decode_u8().unwrap();

        input.set_auto_commit(false);
        input.decode_u16().unwrap();
        input.decode_u32().unwrap();
        assert_eq!(input.position(), 1);
        assert_eq!(input.total_read(), 7);

        input.discard(None);
        assert_eq!(input.position(), 1);
        assert_eq!(input.total_read(), 1);
        assert_eq!(input.decode_u8().unwrap(), 2);
    }

    #[test]
    fn commit_advances_by_decoded_bytes() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut input = DecodeBuffer::new(&data[..]);
        input.set_auto_commit(false);
        input.decode_u8().unwrap();
        input.decode_u16().unwrap();
        input.decode_u32().unwrap();
        assert_eq!(input.position(), 0);

        input.commit();
        assert_eq!(input.position(), 7);
        input.discard(None);
        assert_eq!(input.position(), 7);
        assert_eq!(input.decode_u8().unwrap(), 8);
    }

    #[test]
    fn partial_discard() {
        let data = [1, 2, 3, 4];
        let mut input = DecodeBuffer::new(&data[..]);
        input.set_auto_commit(false);
        input.decode_bytes(3).unwrap();
        input.discard(Some(2));
        assert_eq!(input.pending(), 1);
        assert_eq!(input.decode_u8().unwrap(), 2);

        input.discard(Some(100));
        assert_eq!(input.pending(), 0);

        input.decode_u8().unwrap();
        input.set_auto_commit(true);
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn source_is_not_read_twice() {
        let pulled = std::rc::Rc::new(std::cell::Cell::new(0));
        let data = [0xAA, 0xBB, 0xCC];
        let mut input = DecodeBuffer::new(Trickle {
            data: &data,
            pulled: pulled.clone(),
        });

        input.set_auto_commit(false);
        assert_eq!(input.decode_u16().unwrap(), 0xBBAA);
        input.discard(None);
        assert_eq!(input.decode_u16().unwrap(), 0xBBAA);
        assert_eq!(pulled.get(), 2);

        assert_eq!(input.peek(8).unwrap(), &[0xCC]);
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn magic_is_one_shot() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
        let mut input = DecodeBuffer::with_order(&data[..], ByteOrder::BigEndian);
        input.decode_magic(0xCAFE_BABE_u32).unwrap();
        assert_eq!(input.position(), 4);

        let second = input.decode_magic(0xCAFE_BABE_u32);
        assert!(matches!(second, Err(Error::MagicMismatch { .. })));
        assert_eq!(input.position(), 4);
        assert_eq!(input.decode_u32().unwrap(), 0x34);
    }

    #[test]
    fn limit_bounds_the_window() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut input = DecodeBuffer::new(&data[..]).with_limit(4);
        assert_eq!(input.peek(10).unwrap(), &[1, 2, 3, 4]);
        assert!(matches!(input.decode_array::<u8>(5), Err(Error::OutOfBounds)));
        assert_eq!(input.position(), 0);
        input.skip(4).unwrap();
        assert!(!input.has_remaining().unwrap());
    }

    #[test]
    fn slice_is_independent() {
        let data = [0x00, 0x01, 0x00, 0x02, 0x09];
        let mut input = DecodeBuffer::with_order(&data[..], ByteOrder::BigEndian);
        let mut slice = input.slice(4).unwrap();
        assert_eq!(input.position(), 4);

        assert_eq!(slice.decode_u16().unwrap(), 1);
        assert_eq!(slice.decode_u16().unwrap(), 2);
        assert!(!slice.has_remaining().unwrap());
        assert_eq!(input.decode_u8().unwrap(), 9);
    }

    #[test]
    fn transactional_rolls_back() {
        let data = [1, 2, 3];
        let mut input = DecodeBuffer::new(&data[..]);

        let result = input.transactional(|buffer| {
            buffer.decode_u16()?;
            buffer.decode_u16()
        });
        assert!(matches!(result, Err(Error::OutOfBounds)));
        assert_eq!(input.position(), 0);
        assert!(input.auto_commit());

        let value = input.transactional(|buffer| buffer.decode_u16()).unwrap();
        assert_eq!(value, 0x0201);
        assert_eq!(input.position(), 2);
    }

    #[test]
    fn oversized_requests_fail_without_allocating() {
        let data = [1_u8, 2, 3];

        let mut input = DecodeBuffer::new(&data[..]);
        assert!(matches!(input.decode_bytes(usize::MAX), Err(Error::OutOfBounds)));
        assert!(matches!(input.slice(u32::MAX as usize), Err(Error::OutOfBounds)));
        assert!(matches!(input.decode_array::<u32>(usize::MAX), Err(Error::OutOfBounds)));
        assert_eq!(input.peek(usize::MAX).unwrap(), &data);
        assert!(input.lookahead.capacity() < 4 * READ_CHUNK);

        assert_eq!(input.decode_bytes(3).unwrap(), data);
        assert_eq!(input.position(), 3);
    }

    #[test]
    fn io_errors_propagate() {
        let mut input = DecodeBuffer::new(Failing);
        match input.decode_u8() {
            Err(Error::FileError(error)) => assert_eq!(error.kind(), ErrorKind::PermissionDenied),
            other => panic!("unexpected {other:?}"),
        }
    }
}
