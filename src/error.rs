use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::Malformed`] - Corrupted index, descriptor or reference-table data
/// - [`Error::MagicMismatch`] - A stream did not start with the expected magic value
/// - [`Error::OpcodeTooLong`] - An opcode exceeds the 255 byte limit
/// - [`Error::OpcodeWidth`] - An opcode does not fit into its encoding width
/// - [`Error::DescriptorSize`] - A descriptor serialized to a different size than declared
/// - [`Error::Descriptor`] - A stored descriptor failed to load, tagged with its opcode
///
/// ## Bounds
/// - [`Error::OutOfBounds`] - A read went past the available data
/// - [`Error::Empty`] - Empty input provided
///
/// ## Resolution Errors
/// - [`Error::UnknownSymbol`] - An operand referenced a symbol the decoder does not know
/// - [`Error::NoActiveDecoder`] - The active decoder was requested outside of a decode call
/// - [`Error::DecoderTypeMismatch`] - The active decoder is not of the requested type
///
/// ## I/O
/// - [`Error::FileError`] - Failures of the underlying source or sink, propagated unchanged
///
/// Unrecognized opcode runs are not errors; they are reported as unknown instructions.
///
/// # Examples
///
/// ```rust
/// use opscope::{Error, Opcode};
///
/// match Opcode::parse("0F 01 ZZ") {
///     Ok(opcode) => println!("parsed {opcode}"),
///     Err(Error::Malformed { message, .. }) => eprintln!("bad opcode: {message}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A magic value check at the current stream position failed.
    #[error("Magic mismatch - expected {expected}, found {found}")]
    MagicMismatch {
        /// The expected value, formatted as hex
        expected: String,
        /// The value actually decoded, formatted as hex
        found: String,
    },

    /// An opcode longer than 255 bytes was constructed or encountered.
    #[error("Opcode length {0} exceeds the maximum of 255 bytes")]
    OpcodeTooLong(usize),

    /// An opcode does not fit into the requested fixed encoding width.
    ///
    /// The encoding needs one leading length byte, so `length` must be smaller than `width`.
    #[error("Opcode of length {length} does not fit into an encoding width of {width}")]
    OpcodeWidth {
        /// Length of the opcode in bytes
        length: usize,
        /// The requested field width
        width: usize,
    },

    /// A descriptor wrote a different amount of bytes than it declared when it was added.
    #[error("Descriptor for opcode [{opcode}] declared {declared} bytes but wrote {written}")]
    DescriptorSize {
        /// The opcode, formatted as hex
        opcode: String,
        /// Size recorded when the descriptor was added
        declared: u64,
        /// Size written while saving
        written: u64,
    },

    /// A stored descriptor could not be loaded.
    #[error("Failed to load descriptor for opcode [{opcode}] - {source}")]
    Descriptor {
        /// The opcode, formatted as hex
        opcode: String,
        /// The underlying failure
        source: Box<Error>,
    },

    /// An out of bound access was attempted.
    ///
    /// Raised for truncated streams and for reads past the end of a slice.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// An operand referenced a symbol that the active decoder cannot resolve.
    #[error("Unknown symbol - {0}")]
    UnknownSymbol(u64),

    /// The active decoder was requested while no decode call is running on this thread.
    #[error("No decoder is active on this thread")]
    NoActiveDecoder,

    /// The active decoder is not of the requested concrete type.
    #[error("Active decoder '{actual}' is not a {expected}")]
    DecoderTypeMismatch {
        /// The requested type name
        expected: &'static str,
        /// Name of the decoder that is actually active
        actual: String,
    },

    /// File I/O error.
    ///
    /// Wraps failures of the underlying byte source or output sink.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
