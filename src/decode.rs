//! The resumable decoder contract and its standard strategies.
//!
//! # Contract
//!
//! A [`Decoder`] is an object, not a function: it owns whatever progress it
//! has made on the current value. Each call to [`Decoder::decode`] pulls as
//! many bytes as the source offers and answers one of:
//!
//! - [`DecodeState::Done`]: the value is complete. The decoder has already
//!   soft-reset itself and may be called again for the next value.
//! - [`DecodeState::Processing`]: the source ran dry. Every byte read so far
//!   has been retained; call again once more bytes are available.
//! - [`DecodeState::Error`]: the input is malformed or the source failed.
//!   Progress is undefined until [`Decoder::reset`] is called.
//!
//! Sources are never rewound, so resetting a decoder discards its partial
//! value but not the bytes it has already consumed.

mod adapt;
mod primitive;
mod repeat;
mod sized;
mod state;

use alloc::boxed::Box;

pub use adapt::{AndThen, DecoderExt, Map, MapLazy, MapState, Optional, TryMap, Zip};
pub use primitive::{
    Constant, EnumDecoder, Failing, FixedDecoder, Primitive, Variants, constant, fixed,
};
pub use repeat::{PrefixedRepeat, Repeat, UntilRepeat};
pub use sized::{
    Convert, MarkerDecoder, PrefixedDecoder, Raw, Skip, StringDecoder, Text, TextDecoder, bytes,
    marker_string, string, string_with, text,
};
pub use state::{DecodeState, Done};

use crate::io::ByteSource;

/// A resumable decoder of values of type `T`.
///
/// See the [module documentation](self) for the contract.
pub trait Decoder<T> {
    /// Advance decoding with whatever bytes `source` can provide.
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T>;

    /// Discard all progress, including nested decoders and buffers.
    fn reset(&mut self);

    /// Decode from an in-memory buffer.
    fn decode_slice(&mut self, bytes: &[u8]) -> DecodeState<T> {
        let mut source = bytes;
        self.decode(&mut source)
    }
}

impl<T, D: Decoder<T> + ?Sized> Decoder<T> for Box<D> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        (**self).decode(source)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

impl<T, D: Decoder<T> + ?Sized> Decoder<T> for &mut D {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        (**self).decode(source)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
