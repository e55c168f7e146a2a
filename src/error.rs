//! Errors reported while building, decoding and encoding.

use alloc::{
    borrow::Cow,
    string::{FromUtf8Error, String},
};

use thiserror::Error;

/// A failure reported by a stream-backed source or sink.
///
/// Uninhabited without Cargo feature `std`, where no stream adapters exist.
#[cfg(feature = "std")]
pub type IoError = std::io::Error;

/// A failure reported by a stream-backed source or sink.
///
/// Uninhabited without Cargo feature `std`, where no stream adapters exist.
#[cfg(not(feature = "std"))]
pub type IoError = core::convert::Infallible;

#[cfg(feature = "std")]
extern crate std;

/// An error decoding a value.
///
/// Once a decoder reports one of these, its progress is undefined until it is
/// reset.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A size or count prefix decoded to a negative number.
    #[error("Size must not be negative ({0}).")]
    NegativeSize(i64),
    /// A size or count prefix cannot be represented in memory.
    #[error("Size does not fit in memory ({0}).")]
    SizeOverflow(i64),
    /// An enumeration ordinal has no matching variant.
    #[error("Ordinal {ordinal} is out of range for {count} variants.")]
    InvalidOrdinal { ordinal: i64, count: usize },
    /// An enumeration name has no matching variant.
    #[error("Unknown variant name ({0:?}).")]
    UnknownVariant(String),
    /// A UTF-8 string was malformed.
    #[error("Malformed UTF-8 string: {0}.")]
    Utf8(#[from] FromUtf8Error),
    /// A UTF-16 string was malformed.
    #[error("Malformed UTF-16 string.")]
    Utf16,
    /// An ASCII string contained a byte above `0x7f`.
    #[error("Non-ASCII byte ({0:#04x}) in ASCII string.")]
    NonAscii(u8),
    /// A composed script took a different shape when replayed.
    #[error("Composed script changed shape at step {step}.")]
    InconsistentScript { step: usize },
    /// A custom failure raised by a script or adapter.
    #[error("{0}")]
    Message(Cow<'static, str>),
    /// An error from the wrapped stream.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// An error encoding a value.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A length does not fit the configured size prefix.
    #[error("Length ({len}) does not fit the size prefix.")]
    SizeOverflow { len: usize },
    /// A bit range reaches past the end of its buffer.
    #[error("Bit range {start}+{len} exceeds the {available} bits available.")]
    BitRange {
        start: usize,
        len: usize,
        available: usize,
    },
    /// An ASCII string contained a non-ASCII character.
    #[error("Non-ASCII character ({0:?}) in ASCII string.")]
    NonAscii(char),
    /// A custom failure raised by a script or adapter.
    #[error("{0}")]
    Message(Cow<'static, str>),
    /// An error from the wrapped stream.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// An error constructing a codec from invalid parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// An end marker must contain at least one byte.
    #[error("End marker must not be empty.")]
    EmptyMarker,
    /// A repetition count must not be negative.
    #[error("Arity must not be negative ({0}).")]
    NegativeArity(i64),
}
