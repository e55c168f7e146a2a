use alloc::{borrow::Cow, string::String};
use core::marker::PhantomData;

use zerocopy::byteorder::{BigEndian, F32, F64, I16, I32, I64, LittleEndian, U16, U32, U64};

use super::{DecodeState, Decoder, StringDecoder, string};
use crate::{config::Endianness, error::DecodeError, io::ByteSource};

/// A fixed-width value stored as [`Self::Bytes`](Primitive::Bytes).
pub trait Primitive: Copy + 'static {
    /// The raw representation.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default + Copy;

    /// Human-readable name used in diagnostics.
    const NAME: &'static str;

    fn from_bytes(bytes: Self::Bytes, order: Endianness) -> Self;

    fn to_bytes(self, order: Endianness) -> Self::Bytes;
}

macro_rules! primitive {
    ($t:ident, $wrapper:ident, $(#[$attr:meta])*) => {
        $(#[$attr])*
        impl Primitive for $t {
            type Bytes = [u8; size_of::<$t>()];

            const NAME: &'static str = stringify!($t);

            fn from_bytes(bytes: Self::Bytes, order: Endianness) -> Self {
                match order {
                    Endianness::Big => {
                        let x: $wrapper<BigEndian> = zerocopy::transmute!(bytes);
                        x.get()
                    }
                    Endianness::Little => {
                        let x: $wrapper<LittleEndian> = zerocopy::transmute!(bytes);
                        x.get()
                    }
                }
            }

            fn to_bytes(self, order: Endianness) -> Self::Bytes {
                match order {
                    Endianness::Big => zerocopy::transmute!($wrapper::<BigEndian>::new(self)),
                    Endianness::Little => zerocopy::transmute!($wrapper::<LittleEndian>::new(self)),
                }
            }
        }
    };
}

primitive!(u16, U16, /** Two bytes. */);
primitive!(i16, I16, /** Two bytes, two's complement. */);
primitive!(u32, U32, /** Four bytes. */);
primitive!(i32, I32, /** Four bytes, two's complement. */);
primitive!(u64, U64, /** Eight bytes. */);
primitive!(i64, I64, /** Eight bytes, two's complement. */);
primitive!(f32, F32, /** Four bytes, IEEE 754 binary32. */);
primitive!(f64, F64, /** Eight bytes, IEEE 754 binary64. */);

/// One byte.
impl Primitive for u8 {
    type Bytes = [u8; 1];

    const NAME: &'static str = "u8";

    fn from_bytes(bytes: Self::Bytes, _order: Endianness) -> Self {
        bytes[0]
    }

    fn to_bytes(self, _order: Endianness) -> Self::Bytes {
        [self]
    }
}

/// One byte, two's complement.
impl Primitive for i8 {
    type Bytes = [u8; 1];

    const NAME: &'static str = "i8";

    fn from_bytes(bytes: Self::Bytes, _order: Endianness) -> Self {
        bytes[0] as i8
    }

    fn to_bytes(self, _order: Endianness) -> Self::Bytes {
        [self as u8]
    }
}

/// One byte; zero is `false`, anything else `true`.
impl Primitive for bool {
    type Bytes = [u8; 1];

    const NAME: &'static str = "bool";

    fn from_bytes(bytes: Self::Bytes, _order: Endianness) -> Self {
        bytes[0] != 0
    }

    fn to_bytes(self, _order: Endianness) -> Self::Bytes {
        [u8::from(self)]
    }
}

/// Decoder buffering exactly the bytes of one [`Primitive`].
#[derive(Debug, Clone)]
pub struct FixedDecoder<T: Primitive> {
    order: Endianness,
    buffer: T::Bytes,
    filled: usize,
}

/// Create a decoder for a primitive in the given byte order.
pub fn fixed<T: Primitive>(order: Endianness) -> FixedDecoder<T> {
    FixedDecoder::new(order)
}

impl<T: Primitive> FixedDecoder<T> {
    pub fn new(order: Endianness) -> Self {
        Self {
            order,
            buffer: T::Bytes::default(),
            filled: 0,
        }
    }
}

impl<T: Primitive> Default for FixedDecoder<T> {
    fn default() -> Self {
        Self::new(Endianness::default())
    }
}

impl<T: Primitive> Decoder<T> for FixedDecoder<T> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        let buffer = self.buffer.as_mut();
        while self.filled < buffer.len() {
            match source.read_into(&mut buffer[self.filled..]) {
                Ok(0) => return DecodeState::processing(T::NAME),
                Ok(n) => self.filled += n,
                Err(err) => return DecodeState::Error(err),
            }
        }
        self.filled = 0;
        DecodeState::done(T::from_bytes(self.buffer, self.order))
    }

    fn reset(&mut self) {
        self.filled = 0;
    }
}

/// Decoder producing a fixed value without reading any bytes.
#[derive(Debug, Clone)]
pub struct Constant<T>(pub T);

pub fn constant<T: Clone>(value: T) -> Constant<T> {
    Constant(value)
}

impl<T: Clone> Decoder<T> for Constant<T> {
    fn decode(&mut self, _source: &mut dyn ByteSource) -> DecodeState<T> {
        DecodeState::done(self.0.clone())
    }

    fn reset(&mut self) {}
}

/// Decoder that always fails, for positions that must never be reached.
#[derive(Debug, Clone)]
pub struct Failing {
    reason: Cow<'static, str>,
}

impl Failing {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl<T> Decoder<T> for Failing {
    fn decode(&mut self, _source: &mut dyn ByteSource) -> DecodeState<T> {
        DecodeState::Error(DecodeError::Message(self.reason.clone()))
    }

    fn reset(&mut self) {}
}

/// A field-less enumeration with a fixed set of variants.
pub trait Variants: Copy + PartialEq + 'static {
    /// Every variant, in ordinal order.
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn ordinal(self) -> usize {
        Self::ALL.iter().position(|&v| v == self).unwrap_or(0)
    }
}

/// Decoder for a [`Variants`] enumeration, stored as an ordinal or a name.
#[derive(Debug)]
pub struct EnumDecoder<T> {
    lookup: Lookup,
    _phantom: PhantomData<fn() -> T>,
}

#[derive(Debug)]
enum Lookup {
    Ordinal(FixedDecoder<i32>),
    Name(StringDecoder),
}

impl<T: Variants> EnumDecoder<T> {
    /// Read a four-byte signed ordinal.
    pub fn ordinal(order: Endianness) -> Self {
        Self {
            lookup: Lookup::Ordinal(FixedDecoder::new(order)),
            _phantom: PhantomData,
        }
    }

    /// Read the variant name as a length-prefixed UTF-8 string.
    pub fn name(order: Endianness) -> Self {
        Self {
            lookup: Lookup::Name(string(order)),
            _phantom: PhantomData,
        }
    }
}

impl<T: Variants> Decoder<T> for EnumDecoder<T> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        match &mut self.lookup {
            Lookup::Ordinal(decoder) => decoder.decode(source).and_then(|ordinal| {
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| T::ALL.get(i).copied())
                    .ok_or(DecodeError::InvalidOrdinal {
                        ordinal: ordinal.into(),
                        count: T::ALL.len(),
                    })
            }),
            Lookup::Name(decoder) => decoder.decode(source).and_then(|name: String| {
                T::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == name)
                    .ok_or(DecodeError::UnknownVariant(name))
            }),
        }
    }

    fn reset(&mut self) {
        match &mut self.lookup {
            Lookup::Ordinal(decoder) => decoder.reset(),
            Lookup::Name(decoder) => decoder.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Suit {
        Hearts,
        Spades,
    }

    impl Variants for Suit {
        const ALL: &'static [Self] = &[Self::Hearts, Self::Spades];

        fn name(self) -> &'static str {
            match self {
                Self::Hearts => "hearts",
                Self::Spades => "spades",
            }
        }
    }

    #[test]
    fn byte_order_is_respected() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(
            fixed::<u32>(Endianness::Big).decode_slice(&bytes).into_value(),
            Some(0x0102_0304)
        );
        assert_eq!(
            fixed::<u32>(Endianness::Little).decode_slice(&bytes).into_value(),
            Some(0x0403_0201)
        );
        assert_eq!(0x0102_0304u32.to_bytes(Endianness::Little), [4, 3, 2, 1]);
    }

    #[test]
    fn partial_reads_resume_and_soft_reset() {
        let mut decoder = fixed::<i16>(Endianness::Big);
        assert!(decoder.decode_slice(&[0xff]).is_processing());
        assert!(decoder.decode_slice(&[]).is_processing());
        assert_eq!(decoder.decode_slice(&[0xfe]).into_value(), Some(-2));
        assert_eq!(decoder.decode_slice(&[0x00, 0x07]).into_value(), Some(7));
    }

    #[test]
    fn floats_use_raw_bits() {
        let bytes = 1.5f64.to_bytes(Endianness::Big);
        assert_eq!(bytes, 0x3ff8_0000_0000_0000u64.to_be_bytes());
        assert_eq!(
            fixed::<f64>(Endianness::Big).decode_slice(&bytes).into_value(),
            Some(1.5)
        );
    }

    #[test]
    fn any_nonzero_byte_is_true() {
        let mut decoder = fixed::<bool>(Endianness::Big);
        assert_eq!(decoder.decode_slice(&[0]).into_value(), Some(false));
        assert_eq!(decoder.decode_slice(&[0x20]).into_value(), Some(true));
    }

    #[test]
    fn enum_ordinals_are_range_checked() {
        let mut decoder = EnumDecoder::<Suit>::ordinal(Endianness::Big);
        assert_eq!(decoder.decode_slice(&[0, 0, 0, 1]).into_value(), Some(Suit::Spades));
        assert!(matches!(
            decoder.decode_slice(&[0, 0, 0, 2]),
            DecodeState::Error(DecodeError::InvalidOrdinal { ordinal: 2, count: 2 })
        ));
        decoder.reset();
        assert!(matches!(
            decoder.decode_slice(&[0xff, 0xff, 0xff, 0xff]),
            DecodeState::Error(DecodeError::InvalidOrdinal { ordinal: -1, .. })
        ));
    }

    #[test]
    fn enum_names_must_match() {
        let mut decoder = EnumDecoder::<Suit>::name(Endianness::Big);
        let bytes = [0, 0, 0, 6, b'h', b'e', b'a', b'r', b't', b's'];
        assert_eq!(decoder.decode_slice(&bytes).into_value(), Some(Suit::Hearts));
        let bytes = [0, 0, 0, 5, b'c', b'l', b'u', b'b', b's'];
        assert!(matches!(
            decoder.decode_slice(&bytes),
            DecodeState::Error(DecodeError::UnknownVariant(name)) if name == "clubs"
        ));
    }

    #[test]
    fn constant_reads_nothing() {
        let mut source: &[u8] = &[9];
        assert_eq!(constant('x').decode(&mut source).into_value(), Some('x'));
        assert_eq!(source, [9]);
        let state: DecodeState<u8> = Failing::new("unreachable").decode(&mut source);
        assert!(state.is_error());
    }
}
