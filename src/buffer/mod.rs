//! Transactional input and output buffers.
//!
//! Instruction decoders read operands from a [`crate::buffer::decode::DecodeBuffer`] and
//! write formatted text to a [`crate::buffer::encode::EncodeBuffer`]. Both sides support the
//! same speculation model: switch auto-commit off, work, then commit or discard.
//!
//! # Key Components
//!
//! - [`crate::buffer::decode::DecodeBuffer`] - Byte-order aware primitive decoding with
//!   rollback over a forward-only [`std::io::Read`]
//! - [`crate::buffer::encode::EncodeBuffer`] - Classified output with deferred, discardable
//!   writes
//! - [`crate::buffer::sink::Sink`] - The real output destination, with
//!   [`crate::buffer::sink::TextSink`] and [`crate::buffer::sink::Transcript`] implementations

pub mod decode;
pub mod encode;
pub mod sink;
