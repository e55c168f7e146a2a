//! The stateless encoder contract and its standard implementations.
//!
//! An [`Encoder`] writes a value to a [`ByteSink`] and keeps no state between
//! calls, so one encoder may serve many threads at once as long as each call
//! writes to its own sink.

mod adapt;
mod primitive;

use alloc::{boxed::Box, rc::Rc, sync::Arc, vec::Vec};

pub use adapt::{Contramap, EncoderExt, OptionalEncoder, Pair, Sequence, Terminated};
pub use primitive::{
    EnumEncoder, FixedEncoder, FnEncoder, MarkerEncoder, Nothing, PrefixedEncoder, Render,
    StringEncoder, TextEncoder, bytes, from_fn, marker_string, string, string_with, text,
};

use crate::{
    error::EncodeError,
    io::{BitWriter, ByteSink},
};

/// An encoder of values of type `T`.
pub trait Encoder<T: ?Sized> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError>;

    /// Encode into a new buffer, padding a trailing partial byte with zeros.
    fn encode_to_vec(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let mut sink = BitWriter::new(Vec::new());
        self.encode(value, &mut sink)?;
        sink.flush()?;
        Ok(sink.into_inner())
    }
}

impl<T: ?Sized, E: Encoder<T> + ?Sized> Encoder<T> for &E {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        (**self).encode(value, sink)
    }
}

impl<T: ?Sized, E: Encoder<T> + ?Sized> Encoder<T> for Box<E> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        (**self).encode(value, sink)
    }
}

impl<T: ?Sized, E: Encoder<T> + ?Sized> Encoder<T> for Rc<E> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        (**self).encode(value, sink)
    }
}

impl<T: ?Sized, E: Encoder<T> + ?Sized> Encoder<T> for Arc<E> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        (**self).encode(value, sink)
    }
}
