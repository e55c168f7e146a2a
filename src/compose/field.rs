use alloc::{string::String, vec::Vec};

use super::{ComposedDecoder, ComposedEncoder, DecodingScope, EncodingScope, Step};
use crate::{
    config::Config,
    error::{DecodeError, EncodeError},
};

/// A value that can be read and written as one field of a composed script.
pub trait Field: Sized + Clone + 'static {
    fn decode_field<E>(scope: &mut DecodingScope<'_, E>) -> Step<Self>;

    fn encode_field<T>(&self, scope: &mut EncodingScope<'_, '_, T>) -> Result<(), EncodeError>;
}

macro_rules! primitive_fields {
    ($($name:ident: $t:ty),* $(,)?) => {
        $(
            impl Field for $t {
                fn decode_field<E>(scope: &mut DecodingScope<'_, E>) -> Step<Self> {
                    scope.$name()
                }

                fn encode_field<T>(&self, scope: &mut EncodingScope<'_, '_, T>) -> Result<(), EncodeError> {
                    scope.$name(*self)
                }
            }
        )*
    };
}

primitive_fields! {
    boolean: bool,
    u8: u8,
    i8: i8,
    u16: u16,
    i16: i16,
    u32: u32,
    i32: i32,
    u64: u64,
    i64: i64,
    f32: f32,
    f64: f64,
}

impl Field for String {
    fn decode_field<E>(scope: &mut DecodingScope<'_, E>) -> Step<Self> {
        scope.string()
    }

    fn encode_field<T>(&self, scope: &mut EncodingScope<'_, '_, T>) -> Result<(), EncodeError> {
        scope.string(self)
    }
}

/// A one-byte presence flag, then the value if present.
impl<F: Field> Field for Option<F> {
    fn decode_field<E>(scope: &mut DecodingScope<'_, E>) -> Step<Self> {
        scope.optional(F::decode_field)
    }

    fn encode_field<T>(&self, scope: &mut EncodingScope<'_, '_, T>) -> Result<(), EncodeError> {
        scope.boolean(self.is_some())?;
        match self {
            Some(value) => value.encode_field(scope),
            None => Ok(()),
        }
    }
}

/// A four-byte signed count, then every element.
impl<F: Field> Field for Vec<F> {
    fn decode_field<E>(scope: &mut DecodingScope<'_, E>) -> Step<Self> {
        let size = scope.i32()?;
        let Ok(count) = usize::try_from(size) else {
            tracing::debug!(size, "rejected negative element count");
            Err(DecodeError::NegativeSize(size.into()))?
        };
        (0..count).map(|_| F::decode_field(scope)).collect()
    }

    fn encode_field<T>(&self, scope: &mut EncodingScope<'_, '_, T>) -> Result<(), EncodeError> {
        let len = self.len();
        let count = i32::try_from(len).map_err(|_| EncodeError::SizeOverflow { len })?;
        scope.i32(count)?;
        self.iter().try_for_each(|value| value.encode_field(scope))
    }
}

/// The decoding script of a [`Transcode`] type.
pub type DecodeFn<T> = fn(&mut DecodingScope<'_, T>) -> Step<T>;

/// The encoding script of a [`Transcode`] type.
pub type EncodeFn<T> = for<'s, 'v> fn(&'v T, &mut EncodingScope<'s, 'v, T>) -> Result<(), EncodeError>;

/// A type with a composed decoder and encoder.
///
/// Usually derived; see [`derive@crate::Transcode`].
pub trait Transcode: Sized + Clone + 'static {
    /// Read every field, in declaration order.
    fn decode_fields(scope: &mut DecodingScope<'_, Self>) -> Step<Self>;

    /// Write every field, in declaration order.
    fn encode_fields<'v>(&'v self, scope: &mut EncodingScope<'_, 'v, Self>) -> Result<(), EncodeError>;

    fn decoder() -> ComposedDecoder<Self, DecodeFn<Self>> {
        Self::decoder_with(Config::new())
    }

    fn decoder_with(config: Config) -> ComposedDecoder<Self, DecodeFn<Self>> {
        ComposedDecoder::with_config(config, Self::decode_fields as DecodeFn<Self>)
    }

    fn encoder() -> ComposedEncoder<Self, EncodeFn<Self>> {
        Self::encoder_with(Config::new())
    }

    fn encoder_with(config: Config) -> ComposedEncoder<Self, EncodeFn<Self>> {
        ComposedEncoder::with_config(config, Self::encode_fields as EncodeFn<Self>)
    }
}
