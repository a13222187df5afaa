//! Top-level decode calls and the active decoder.
//!
//! A [`MachineCodeDecoder`] owns its [`DecoderSettings`] and a per-instruction decode loop.
//! [`decode`] and [`decode_range`] wrap one top-level call: they bind the decoder as the
//! thread's active decoder, set up the [`crate::DecodeBuffer`] and [`crate::EncodeBuffer`]
//! around the raw source and sink, run the loop and restore the previous binding.
//!
//! Nested operand decoders reach the running decoder with [`active_decoder_as`]. A decode
//! call made from inside another one shadows the outer decoder until it returns.
//!
//! # Examples
//!
//! ```rust
//! use std::rc::Rc;
//! use opscope::prelude::*;
//!
//! struct Bytes {
//!     settings: DecoderSettings,
//! }
//!
//! impl MachineCodeDecoder for Bytes {
//!     fn settings(&self) -> &DecoderSettings {
//!         &self.settings
//!     }
//!
//!     fn decode_instructions(
//!         &self,
//!         input: &mut DecodeBuffer<'_>,
//!         output: &mut EncodeBuffer<'_>,
//!     ) -> Result<()> {
//!         assert_eq!(active_decoder()?.name(), "bytes");
//!         while input.has_remaining()? {
//!             output.println_value(format!("{:02x}", input.decode_u8()?))?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let decoder = Rc::new(Bytes { settings: DecoderSettings::new("bytes") });
//! let mut transcript = Transcript::new();
//! let decoded = decode_range(&decoder, &[1_u8, 2, 3, 4][..], &mut transcript, 1, Some(2))?;
//!
//! assert_eq!(decoded, 2);
//! assert_eq!(transcript.texts(), vec!["02".to_string(), "03".to_string()]);
//! # Ok::<(), opscope::Error>(())
//! ```

mod active;

pub use active::{active_decoder, active_decoder_as, decode_depth, ActiveDecoder};

use std::{cell::Cell, io::Read, rc::Rc};

use log::debug;

use crate::{
    buffer::{decode::DecodeBuffer, encode::EncodeBuffer, sink::Sink},
    file::io::ByteOrder,
    Result,
};
use active::ActiveScope;

/// Name, byte order and default decode limit of a decoder.
///
/// The byte order and limit can be changed through a shared reference, so a decoder shared
/// through an [`Rc`] stays reconfigurable.
#[derive(Debug, Clone)]
pub struct DecoderSettings {
    name: String,
    byte_order: Cell<ByteOrder>,
    default_limit: Cell<Option<u64>>,
}

impl DecoderSettings {
    /// Little-endian settings without a default limit.
    pub fn new(name: impl Into<String>) -> DecoderSettings {
        DecoderSettings {
            name: name.into(),
            byte_order: Cell::new(ByteOrder::LittleEndian),
            default_limit: Cell::new(None),
        }
    }

    /// Replaces the byte order.
    #[must_use]
    pub fn with_byte_order(self, order: ByteOrder) -> DecoderSettings {
        self.byte_order.set(order);
        self
    }

    /// Replaces the default limit.
    #[must_use]
    pub fn with_default_limit(self, limit: Option<u64>) -> DecoderSettings {
        self.default_limit.set(limit);
        self
    }

    /// Name of the decoder
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte order used for the input of every decode call
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order.get()
    }

    /// Changes the byte order used by subsequent decode calls.
    pub fn set_byte_order(&self, order: ByteOrder) {
        self.byte_order.set(order);
    }

    /// Maximum number of bytes decoded when a call does not pass its own limit
    #[must_use]
    pub fn default_limit(&self) -> Option<u64> {
        self.default_limit.get()
    }

    /// Changes the default limit used by subsequent decode calls.
    pub fn set_default_limit(&self, limit: Option<u64>) {
        self.default_limit.set(limit);
    }
}

/// A disassembler that decodes a whole code stream.
pub trait MachineCodeDecoder: 'static {
    /// The decoder's settings.
    fn settings(&self) -> &DecoderSettings;

    /// Decodes instructions from `input` until it runs dry.
    ///
    /// `input` is already positioned and bounded by the caller's offset and limit.
    ///
    /// # Errors
    /// Returns any failure that should abort the decode call.
    fn decode_instructions(
        &self,
        input: &mut DecodeBuffer<'_>,
        output: &mut EncodeBuffer<'_>,
    ) -> Result<()>;

    /// Name of the decoder.
    fn name(&self) -> &str {
        self.settings().name()
    }
}

/// Decodes all of `source` with `decoder`, honouring the decoder's default limit.
///
/// Returns the number of bytes decoded.
///
/// # Errors
/// See [`decode_range`].
pub fn decode<D: MachineCodeDecoder>(
    decoder: &Rc<D>,
    source: impl Read,
    sink: &mut dyn Sink,
) -> Result<u64> {
    decode_range(decoder, source, sink, 0, None)
}

/// Skips `offset` bytes of `source`, then decodes at most `limit` bytes with `decoder`.
///
/// Without an explicit `limit` the decoder's default limit applies; without either the
/// call runs until the source is exhausted. Returns the number of bytes decoded after
/// `offset`.
///
/// `decoder` is the active decoder for the duration of the call. The previous binding is
/// restored when the call returns, also when it fails.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `source` is shorter than `offset`, and any
/// failure of the decoder's loop or of the sink.
pub fn decode_range<D: MachineCodeDecoder>(
    decoder: &Rc<D>,
    source: impl Read,
    sink: &mut dyn Sink,
    offset: u64,
    limit: Option<u64>,
) -> Result<u64> {
    let settings = decoder.settings();
    let _scope = ActiveScope::enter(Rc::clone(decoder), settings.name());

    let mut input = DecodeBuffer::with_order(source, settings.byte_order());
    if let Some(limit) = limit.or(settings.default_limit()) {
        input = input.with_limit(offset.saturating_add(limit));
    }
    input.skip(offset)?;

    debug!(
        "decoder '{}' started at offset {:#x} ({})",
        settings.name(),
        offset,
        settings.byte_order()
    );

    let mut output = EncodeBuffer::new(sink);
    decoder.decode_instructions(&mut input, &mut output)?;
    output.set_auto_commit(true)?;

    let decoded = input.position() - offset;
    debug!("decoder '{}' finished, {} bytes", settings.name(), decoded);

    Ok(decoded)
}
