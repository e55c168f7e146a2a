//! Codecs written as sequential scripts.
//!
//! A composed decoder is built from a closure that reads a value step by step
//! through a [`DecodingScope`]. The closure is re-run from the top every time
//! the decoder is called again: steps that already finished replay their
//! results instead of touching the source, so a script may suspend on any step
//! and resume without redoing work. A step that asks for another value of the
//! type being decoded ([`DecodingScope::recurse`] and friends) does not call
//! the script recursively. The engine pushes a frame onto a heap-allocated
//! stack and runs the same script in the same loop, so self-referential data of
//! any depth decodes on a constant native stack.
//!
//! ```
//! use std::rc::Rc;
//!
//! use cassette::{Decoder, compose::compose};
//!
//! #[derive(Clone)]
//! struct Link {
//!     label: String,
//!     next: Option<Rc<Link>>,
//! }
//!
//! let mut decoder = compose(|scope| {
//!     let label = scope.string()?;
//!     let next = scope.self_or_none()?.map(Rc::new);
//!     Ok(Link { label, next })
//! });
//! # let _ = decoder.decode_slice(&[]);
//! ```
//!
//! [`ComposedEncoder`] is the mirror image. Its script writes a value through an
//! [`EncodingScope`]; self-references are queued instead of encoded inline and
//! the bytes that follow them are recorded, so the output is identical to an
//! eager recursive encoding while the native stack stays flat.
//!
//! [`Transcode`] ties both together for structs, and `#[derive(Transcode)]`
//! writes the two scripts from the struct definition.

mod builder;
mod decoding;
mod encoding;
mod field;
mod frame;

pub use builder::Composer;
pub use decoding::{ComposedDecoder, DecodingScope, Interrupt, Step, compose};
pub use encoding::{ComposedEncoder, EncodingScope};
pub use field::{DecodeFn, EncodeFn, Field, Transcode};
