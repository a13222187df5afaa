//! Thread-scoped binding of the decoder that is currently running.
//!
//! Every call of [`crate::context::decode`] pushes its decoder onto a per-thread stack and
//! pops it when the call returns, on error paths and during unwinding included. Operand
//! decoders deep inside the call reach the decoder through [`active_decoder_as`] instead of
//! having it passed through every call.

use std::{
    any::{type_name, Any},
    cell::RefCell,
    fmt,
    rc::Rc,
};

use crate::{Error, Result};

#[derive(Clone)]
struct Binding {
    decoder: Rc<dyn Any>,
    name: String,
    type_name: &'static str,
}

thread_local! {
    static ACTIVE: RefCell<Vec<Binding>> = const { RefCell::new(Vec::new()) };
}

/// Keeps a decoder bound for as long as it lives.
pub(crate) struct ActiveScope {
    depth: usize,
}

impl ActiveScope {
    /// Binds `decoder` on the current thread, shadowing the previous binding.
    pub(crate) fn enter<T: Any>(decoder: Rc<T>, name: &str) -> ActiveScope {
        let binding = Binding {
            decoder: decoder as Rc<dyn Any>,
            name: name.to_string(),
            type_name: type_name::<T>(),
        };

        let depth = ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            active.push(binding);
            active.len() - 1
        });

        ActiveScope { depth }
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        let _ = ACTIVE.try_with(|active| active.borrow_mut().truncate(self.depth));
    }
}

/// Handle to the decoder running on the current thread.
#[derive(Clone)]
pub struct ActiveDecoder {
    binding: Binding,
}

impl ActiveDecoder {
    /// Name of the active decoder.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.binding.name
    }

    /// Rust type name of the active decoder.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.binding.type_name
    }

    /// Returns `true` if the active decoder is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.binding.decoder.is::<T>()
    }

    /// Returns the active decoder as its concrete type.
    ///
    /// # Errors
    /// Returns [`crate::Error::DecoderTypeMismatch`] if it is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<Rc<T>> {
        let name = self.binding.name;
        self.binding
            .decoder
            .downcast::<T>()
            .map_err(|_| Error::DecoderTypeMismatch {
                expected: type_name::<T>(),
                actual: name,
            })
    }
}

impl fmt::Debug for ActiveDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveDecoder")
            .field("name", &self.binding.name)
            .field("type_name", &self.binding.type_name)
            .finish()
    }
}

/// Returns the decoder running on the current thread.
///
/// # Errors
/// Returns [`crate::Error::NoActiveDecoder`] outside of a decode call.
pub fn active_decoder() -> Result<ActiveDecoder> {
    ACTIVE
        .with(|active| active.borrow().last().cloned())
        .map(|binding| ActiveDecoder { binding })
        .ok_or(Error::NoActiveDecoder)
}

/// Returns the decoder running on the current thread as a `T`.
///
/// # Errors
/// Returns [`crate::Error::NoActiveDecoder`] outside of a decode call and
/// [`crate::Error::DecoderTypeMismatch`] if the active decoder is not a `T`.
pub fn active_decoder_as<T: Any>() -> Result<Rc<T>> {
    active_decoder()?.downcast::<T>()
}

/// Number of decode calls currently running on this thread.
#[must_use]
pub fn decode_depth() -> usize {
    ACTIVE.with(|active| active.borrow().len())
}
