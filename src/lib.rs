#![no_std]

//! Resumable, recursion-safe binary decoders and encoders.
//!
//! Cassette builds codecs for streaming and deeply nested binary data. A
//! [`Decoder`](decode::Decoder) owns its progress: feed it whatever bytes are
//! available and it answers [`Done`](decode::DecodeState::Done),
//! [`Processing`](decode::DecodeState::Processing) or
//! [`Error`](decode::DecodeState::Error), picking up exactly where it stopped
//! on the next call. An [`Encoder`](encode::Encoder) is a stateless function of
//! a value and a bit-granular [`ByteSink`](io::ByteSink).
//!
//! Most users should begin with the [`compose`] module. Its engines accept an
//! ordinary sequential script ("read a string, then an int, then maybe recurse
//! into self") and turn it into a single codec that suspends across partial
//! input without redoing finished steps, and that decodes or encodes
//! arbitrarily deep self-referential values with a constant native stack.
//!
//! Lower-level building blocks live in [`decode`], [`encode`], [`collect`] and
//! [`io`].
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: enable the [`Transcode`](macro@Transcode) derive macro (default).
//! - `std`: enable stream-based sources and sinks (default).

extern crate alloc;

pub mod collect;
pub mod compose;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;

pub use compose::Transcode;
pub use config::{Charset, Config, Endianness};
pub use decode::{DecodeState, Decoder};
pub use encode::Encoder;
pub use error::{BuildError, DecodeError, EncodeError};
pub use io::{ByteSink, ByteSource};

/// Derive [`Transcode`] for a struct with named fields.
///
/// _Requires Cargo feature `derive`._
///
/// Every field is read and written in declaration order through its
/// [`Field`](compose::Field) implementation. Two attributes change how a field
/// is handled:
///
/// - `#[transcode(nested)]` delegates to the field type's own
///   [`Transcode`] codecs.
/// - `#[transcode(recursive)]` marks a link back to the deriving type, either
///   an `Option` or a `Vec` of `Rc<Self>`/`Arc<Self>`. Owned links
///   (`Box<Self>`, `Self`) are rejected, since decoded values are cloned when a
///   script resumes. Links are followed without growing the native stack.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
///
/// use cassette::Transcode;
///
/// #[derive(Clone, Debug, PartialEq, Transcode)]
/// struct Comment {
///     author: String,
///     score: i32,
///     #[transcode(recursive)]
///     replies: Vec<Rc<Comment>>,
/// }
/// ```
#[cfg(feature = "derive")]
pub use cassette_derive::Transcode;
