use alloc::{borrow::Cow, boxed::Box, string::String, vec::Vec};
use core::marker::PhantomData;

use super::Encoder;
use crate::{
    config::{Charset, Config, Endianness, Framing},
    decode::{Primitive, Raw, Text, Variants},
    error::{BuildError, EncodeError},
    io::ByteSink,
};

/// Encoder writing the bytes of one [`Primitive`].
#[derive(Debug)]
pub struct FixedEncoder<T> {
    order: Endianness,
    _phantom: PhantomData<fn(T)>,
}

impl<T> Clone for FixedEncoder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FixedEncoder<T> {}

impl<T: Primitive> FixedEncoder<T> {
    pub const fn new(order: Endianness) -> Self {
        Self {
            order,
            _phantom: PhantomData,
        }
    }
}

impl<T: Primitive> Default for FixedEncoder<T> {
    fn default() -> Self {
        Self::new(Endianness::default())
    }
}

impl<T: Primitive> Encoder<T> for FixedEncoder<T> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        sink.write_bytes(value.to_bytes(self.order).as_ref())
    }
}

/// Conversion from a value to the bytes written between its delimiters.
pub trait Render<T: ?Sized> {
    fn render<'a>(&self, value: &'a T) -> Result<Cow<'a, [u8]>, EncodeError>;
}

impl Render<[u8]> for Raw {
    fn render<'a>(&self, value: &'a [u8]) -> Result<Cow<'a, [u8]>, EncodeError> {
        Ok(Cow::Borrowed(value))
    }
}

impl Render<Vec<u8>> for Raw {
    fn render<'a>(&self, value: &'a Vec<u8>) -> Result<Cow<'a, [u8]>, EncodeError> {
        Ok(Cow::Borrowed(value))
    }
}

impl Render<str> for Text {
    fn render<'a>(&self, value: &'a str) -> Result<Cow<'a, [u8]>, EncodeError> {
        match self.charset {
            Charset::Utf8 => Ok(Cow::Borrowed(value.as_bytes())),
            charset => Ok(Cow::Owned(charset.encode(value, self.order)?)),
        }
    }
}

impl Render<String> for Text {
    fn render<'a>(&self, value: &'a String) -> Result<Cow<'a, [u8]>, EncodeError> {
        Render::<str>::render(self, value)
    }
}

/// Encoder writing content preceded by its length.
///
/// A length that does not fit the size type is an error.
#[derive(Debug, Clone)]
pub struct PrefixedEncoder<S, N, C> {
    size: S,
    render: C,
    _phantom: PhantomData<fn(N)>,
}

/// A string with a four-byte signed length.
pub type StringEncoder = PrefixedEncoder<FixedEncoder<i32>, i32, Text>;

impl<S, N, C> PrefixedEncoder<S, N, C> {
    pub fn new(size: S, render: C) -> Self {
        Self {
            size,
            render,
            _phantom: PhantomData,
        }
    }
}

/// A UTF-8 string preceded by a four-byte signed length.
pub fn string(order: Endianness) -> StringEncoder {
    string_with(FixedEncoder::new(order), Charset::Utf8, order)
}

/// A string preceded by a length written with `size`.
pub fn string_with<S, N>(size: S, charset: Charset, order: Endianness) -> PrefixedEncoder<S, N, Text>
where
    S: Encoder<N>,
    N: TryFrom<usize>,
{
    PrefixedEncoder::new(size, Text { charset, order })
}

/// Raw bytes preceded by a length written with `size`.
pub fn bytes<S, N>(size: S) -> PrefixedEncoder<S, N, Raw>
where
    S: Encoder<N>,
    N: TryFrom<usize>,
{
    PrefixedEncoder::new(size, Raw)
}

impl<T, S, N, C> Encoder<T> for PrefixedEncoder<S, N, C>
where
    T: ?Sized,
    S: Encoder<N>,
    N: TryFrom<usize>,
    C: Render<T>,
{
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        let content = self.render.render(value)?;
        let len = content.len();
        let size = N::try_from(len).map_err(|_| EncodeError::SizeOverflow { len })?;
        self.size.encode(&size, sink)?;
        sink.write_bytes(&content)
    }
}

/// Encoder writing content followed by an end marker.
#[derive(Debug, Clone)]
pub struct MarkerEncoder<C> {
    marker: Box<[u8]>,
    render: C,
}

impl<C> MarkerEncoder<C> {
    pub fn new(marker: impl Into<Box<[u8]>>, render: C) -> Result<Self, BuildError> {
        let marker = marker.into();
        if marker.is_empty() {
            Err(BuildError::EmptyMarker)?;
        }
        Ok(Self { marker, render })
    }
}

/// A string followed by `marker`.
pub fn marker_string(
    marker: impl Into<Box<[u8]>>,
    charset: Charset,
    order: Endianness,
) -> Result<MarkerEncoder<Text>, BuildError> {
    MarkerEncoder::new(marker, Text { charset, order })
}

impl<T: ?Sized, C: Render<T>> Encoder<T> for MarkerEncoder<C> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        sink.write_bytes(&self.render.render(value)?)?;
        sink.write_bytes(&self.marker)
    }
}

/// The string encoder described by a [`Config`].
#[derive(Debug, Clone)]
pub enum TextEncoder {
    Prefixed(StringEncoder),
    Marker(MarkerEncoder<Text>),
}

/// Create the string encoder described by `config`.
pub fn text(config: &Config) -> TextEncoder {
    let render = Text {
        charset: config.charset,
        order: config.endianness,
    };
    match config.framing {
        Framing::Prefixed => {
            TextEncoder::Prefixed(PrefixedEncoder::new(FixedEncoder::new(config.endianness), render))
        }
        Framing::Marker(marker) => TextEncoder::Marker(MarkerEncoder {
            marker: marker.bytes().into(),
            render,
        }),
    }
}

impl Encoder<str> for TextEncoder {
    fn encode(&self, value: &str, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        match self {
            Self::Prefixed(encoder) => encoder.encode(value, sink),
            Self::Marker(encoder) => encoder.encode(value, sink),
        }
    }
}

impl Encoder<String> for TextEncoder {
    fn encode(&self, value: &String, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        Encoder::<str>::encode(self, value, sink)
    }
}

/// Encoder for a [`Variants`] enumeration, stored as an ordinal or a name.
#[derive(Debug, Clone)]
pub enum EnumEncoder<T> {
    Ordinal(FixedEncoder<i32>, PhantomData<fn(T)>),
    Name(StringEncoder, PhantomData<fn(T)>),
}

impl<T: Variants> EnumEncoder<T> {
    /// Write a four-byte signed ordinal.
    pub fn ordinal(order: Endianness) -> Self {
        Self::Ordinal(FixedEncoder::new(order), PhantomData)
    }

    /// Write the variant name as a length-prefixed UTF-8 string.
    pub fn name(order: Endianness) -> Self {
        Self::Name(string(order), PhantomData)
    }
}

impl<T: Variants> Encoder<T> for EnumEncoder<T> {
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        match self {
            Self::Ordinal(encoder, _) => {
                let len = value.ordinal();
                let ordinal = i32::try_from(len).map_err(|_| EncodeError::SizeOverflow { len })?;
                encoder.encode(&ordinal, sink)
            }
            Self::Name(encoder, _) => encoder.encode(value.name(), sink),
        }
    }
}

/// Encoder writing nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nothing;

impl<T: ?Sized> Encoder<T> for Nothing {
    fn encode(&self, _value: &T, _sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        Ok(())
    }
}

/// Encoder backed by a closure.
///
/// Created with [`from_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnEncoder<F>(F);

/// Create an encoder calling `f` for every value.
pub fn from_fn<T, F>(f: F) -> FnEncoder<F>
where
    T: ?Sized,
    F: Fn(&T, &mut dyn ByteSink) -> Result<(), EncodeError>,
{
    FnEncoder(f)
}

impl<T, F> Encoder<T> for FnEncoder<F>
where
    T: ?Sized,
    F: Fn(&T, &mut dyn ByteSink) -> Result<(), EncodeError>,
{
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        (self.0)(value, sink)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Level {
        Low,
        High,
    }

    impl Variants for Level {
        const ALL: &'static [Self] = &[Self::Low, Self::High];

        fn name(self) -> &'static str {
            match self {
                Self::Low => "low",
                Self::High => "high",
            }
        }
    }

    #[test]
    fn primitives_in_both_orders() {
        assert_eq!(FixedEncoder::<i16>::new(Endianness::Big).encode_to_vec(&-2).unwrap(), [0xff, 0xfe]);
        assert_eq!(FixedEncoder::<u32>::new(Endianness::Little).encode_to_vec(&1).unwrap(), [1, 0, 0, 0]);
        assert_eq!(FixedEncoder::<bool>::default().encode_to_vec(&true).unwrap(), [1]);
    }

    #[test]
    fn strings_are_length_prefixed() {
        assert_eq!(string(Endianness::Big).encode_to_vec("hé").unwrap(), [0, 0, 0, 3, b'h', 0xc3, 0xa9]);
        assert_eq!(string(Endianness::Big).encode_to_vec("").unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn narrow_prefix_overflows() {
        let encoder = bytes(FixedEncoder::<u8>::default());
        assert_eq!(encoder.encode_to_vec(&vec![7u8; 3]).unwrap(), [3, 7, 7, 7]);
        assert!(matches!(
            encoder.encode_to_vec(&vec![0u8; 256]),
            Err(EncodeError::SizeOverflow { len: 256 })
        ));
    }

    #[test]
    fn marker_follows_content() {
        let encoder = marker_string(&b"\0"[..], Charset::Ascii, Endianness::Big).unwrap();
        assert_eq!(encoder.encode_to_vec("ok").unwrap(), [b'o', b'k', 0]);
        assert!(encoder.encode_to_vec("ü").is_err());
    }

    #[test]
    fn enums_by_ordinal_and_name() {
        assert_eq!(EnumEncoder::ordinal(Endianness::Big).encode_to_vec(&Level::High).unwrap(), [0, 0, 0, 1]);
        assert_eq!(
            EnumEncoder::name(Endianness::Big).encode_to_vec(&Level::Low).unwrap(),
            [0, 0, 0, 3, b'l', b'o', b'w']
        );
    }

    #[test]
    fn closures_become_encoders() {
        let encoder = from_fn(|value: &u8, sink: &mut dyn ByteSink| {
            sink.write_bits_of(*value, 4, 4)?;
            sink.write_bits_of(*value, 0, 4)
        });
        assert_eq!(encoder.encode_to_vec(&0xab).unwrap(), [0xba]);
        assert!(Nothing.encode_to_vec(&0u8).unwrap().is_empty());
    }
}
