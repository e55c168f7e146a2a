use alloc::{boxed::Box, vec::Vec};
use core::marker::PhantomData;

use super::Encoder;
use crate::{error::EncodeError, io::ByteSink};

/// Combinators available on every [`Encoder`].
pub trait EncoderExt<T: ?Sized>: Encoder<T> + Sized {
    /// Encode a `U` by first converting it to a `T`.
    fn contramap<U: ?Sized, F: Fn(&U) -> T>(self, f: F) -> Contramap<Self, T, F>
    where
        T: Sized,
    {
        Contramap {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Encode a one-byte presence flag, then the value if present.
    fn optional(self) -> OptionalEncoder<Self> {
        OptionalEncoder(self)
    }

    /// Encode a slice as an element count written with `size`, then each
    /// element.
    fn sequence<S, N>(self, size: S) -> Sequence<Self, S, N>
    where
        S: Encoder<N>,
        N: TryFrom<usize>,
    {
        Sequence {
            element: self,
            size,
            _phantom: PhantomData,
        }
    }

    /// Encode a slice as its elements followed by `marker`.
    fn terminated(self, marker: T) -> Terminated<Self, T>
    where
        T: Sized,
    {
        Terminated {
            element: self,
            marker,
        }
    }

    /// Encode a pair with this encoder, then `other`.
    fn zip<B>(self, other: B) -> Pair<Self, B> {
        Pair(self, other)
    }

    fn boxed<'a>(self) -> Box<dyn Encoder<T> + 'a>
    where
        Self: 'a,
    {
        Box::new(self)
    }
}

impl<T: ?Sized, E: Encoder<T>> EncoderExt<T> for E {}

/// See [`EncoderExt::contramap`].
#[derive(Debug, Clone)]
pub struct Contramap<E, T, F> {
    inner: E,
    f: F,
    _phantom: PhantomData<fn(T)>,
}

impl<E: Encoder<T>, T, U: ?Sized, F: Fn(&U) -> T> Encoder<U> for Contramap<E, T, F> {
    fn encode(&self, value: &U, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        self.inner.encode(&(self.f)(value), sink)
    }
}

/// See [`EncoderExt::optional`].
#[derive(Debug, Clone)]
pub struct OptionalEncoder<E>(E);

impl<E: Encoder<T>, T> Encoder<Option<T>> for OptionalEncoder<E> {
    fn encode(&self, value: &Option<T>, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        sink.write_byte(u8::from(value.is_some()))?;
        match value {
            Some(value) => self.0.encode(value, sink),
            None => Ok(()),
        }
    }
}

/// See [`EncoderExt::sequence`].
#[derive(Debug, Clone)]
pub struct Sequence<E, S, N> {
    element: E,
    size: S,
    _phantom: PhantomData<fn(N)>,
}

impl<E, S, N, T> Encoder<[T]> for Sequence<E, S, N>
where
    E: Encoder<T>,
    S: Encoder<N>,
    N: TryFrom<usize>,
{
    fn encode(&self, value: &[T], sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        let len = value.len();
        let size = N::try_from(len).map_err(|_| EncodeError::SizeOverflow { len })?;
        self.size.encode(&size, sink)?;
        value.iter().try_for_each(|e| self.element.encode(e, sink))
    }
}

impl<E, S, N, T> Encoder<Vec<T>> for Sequence<E, S, N>
where
    E: Encoder<T>,
    S: Encoder<N>,
    N: TryFrom<usize>,
{
    fn encode(&self, value: &Vec<T>, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        Encoder::<[T]>::encode(self, value, sink)
    }
}

/// See [`EncoderExt::terminated`].
#[derive(Debug, Clone)]
pub struct Terminated<E, T> {
    element: E,
    marker: T,
}

impl<E: Encoder<T>, T> Encoder<[T]> for Terminated<E, T> {
    fn encode(&self, value: &[T], sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        value.iter().try_for_each(|e| self.element.encode(e, sink))?;
        self.element.encode(&self.marker, sink)
    }
}

impl<E: Encoder<T>, T> Encoder<Vec<T>> for Terminated<E, T> {
    fn encode(&self, value: &Vec<T>, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        Encoder::<[T]>::encode(self, value, sink)
    }
}

/// See [`EncoderExt::zip`].
#[derive(Debug, Clone)]
pub struct Pair<A, B>(A, B);

impl<A: Encoder<T>, T, B: Encoder<U>, U> Encoder<(T, U)> for Pair<A, B> {
    fn encode(&self, value: &(T, U), sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        self.0.encode(&value.0, sink)?;
        self.1.encode(&value.1, sink)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec, vec::Vec};

    use super::*;
    use crate::{
        collect::to_vec,
        config::Endianness,
        decode::{Decoder, DecoderExt, fixed, string},
        encode::{FixedEncoder, string as string_encoder},
    };

    #[test]
    fn sequence_matches_prefixed_repeat() {
        let encoder = FixedEncoder::<u8>::default().sequence(FixedEncoder::<i32>::default());
        let bytes = encoder.encode_to_vec(&vec![9u8, 8]).unwrap();
        assert_eq!(bytes, [0, 0, 0, 2, 9, 8]);
        let mut decoder = fixed::<u8>(Endianness::Big).repeat_prefixed(fixed::<i32>(Endianness::Big), to_vec());
        assert_eq!(decoder.decode_slice(&bytes).into_value(), Some(vec![9, 8]));
    }

    #[test]
    fn terminated_writes_the_marker_last() {
        let encoder = FixedEncoder::<u8>::default().terminated(0);
        assert_eq!(encoder.encode_to_vec(&[1u8, 2, 3][..]).unwrap(), [1, 2, 3, 0]);
        assert_eq!(encoder.encode_to_vec(&Vec::new()).unwrap(), [0]);
    }

    #[test]
    fn optional_round_trip() {
        let encoder = EncoderExt::<String>::optional(string_encoder(Endianness::Big));
        let mut decoder = string(Endianness::Big).optional();
        for value in [None, Some(String::new()), Some(String::from("abc"))] {
            let bytes = encoder.encode_to_vec(&value).unwrap();
            assert_eq!(decoder.decode_slice(&bytes).into_value(), Some(value));
        }
    }

    #[test]
    fn contramap_and_zip() {
        let encoder = FixedEncoder::<u16>::default()
            .contramap(|s: &&str| s.len() as u16)
            .zip(FixedEncoder::<bool>::default());
        assert_eq!(encoder.encode_to_vec(&("four", true)).unwrap(), [0, 4, 1]);
    }
}
