use alloc::{boxed::Box, string::String, vec::Vec};
use core::marker::PhantomData;

use either::Either::{Left, Right};

use super::{DecodeState, Decoder, FixedDecoder};
use crate::{
    config::{Charset, Config, Endianness, Framing, Marker},
    error::{BuildError, DecodeError},
    io::ByteSource,
};

/// Conversion from a delimited run of bytes to a value.
pub trait Convert<T> {
    fn convert(&self, bytes: &[u8]) -> Result<T, DecodeError>;
}

/// Keep the bytes as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Convert<Vec<u8>> for Raw {
    fn convert(&self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(bytes.to_vec())
    }
}

/// Interpret the bytes as a string in a character set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text {
    pub charset: Charset,
    pub order: Endianness,
}

impl Convert<String> for Text {
    fn convert(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        self.charset.decode(bytes, self.order)
    }
}

/// Decoder for content preceded by its length.
///
/// The length is read by a nested, resumable decoder producing any integer
/// type. A negative length is an error. The content buffer is grown as needed
/// and reused across values.
#[derive(Debug, Clone)]
pub struct PrefixedDecoder<S, N, C> {
    size: S,
    convert: C,
    length: Option<usize>,
    buffer: Vec<u8>,
    filled: usize,
    _phantom: PhantomData<fn() -> N>,
}

/// A length-prefixed string with a four-byte signed length.
pub type StringDecoder = PrefixedDecoder<FixedDecoder<i32>, i32, Text>;

impl<S, N, C> PrefixedDecoder<S, N, C> {
    pub fn new(size: S, convert: C) -> Self {
        Self {
            size,
            convert,
            length: None,
            buffer: Vec::new(),
            filled: 0,
            _phantom: PhantomData,
        }
    }
}

/// A UTF-8 string preceded by a four-byte signed length.
pub fn string(order: Endianness) -> StringDecoder {
    string_with(FixedDecoder::new(order), Charset::Utf8, order)
}

/// A string preceded by a length read with `size`.
pub fn string_with<S, N>(size: S, charset: Charset, order: Endianness) -> PrefixedDecoder<S, N, Text>
where
    S: Decoder<N>,
    N: Into<i64>,
{
    PrefixedDecoder::new(size, Text { charset, order })
}

/// Raw bytes preceded by a length read with `size`.
pub fn bytes<S, N>(size: S) -> PrefixedDecoder<S, N, Raw>
where
    S: Decoder<N>,
    N: Into<i64>,
{
    PrefixedDecoder::new(size, Raw)
}

impl<S, N, C, T> Decoder<T> for PrefixedDecoder<S, N, C>
where
    S: Decoder<N>,
    N: Into<i64>,
    C: Convert<T>,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        let length = match self.length {
            Some(length) => length,
            None => {
                let size = match self.size.decode(source).split() {
                    Left(done) => done.into_inner().into(),
                    Right(state) => return state,
                };
                let length = match usize::try_from(size) {
                    Ok(length) => length,
                    Err(_) if size < 0 => {
                        tracing::debug!(size, "rejected negative size prefix");
                        return DecodeState::Error(DecodeError::NegativeSize(size));
                    }
                    Err(_) => return DecodeState::Error(DecodeError::SizeOverflow(size)),
                };
                if let Some(extra) = length.checked_sub(self.buffer.len()) {
                    if self.buffer.try_reserve(extra).is_err() {
                        return DecodeState::Error(DecodeError::SizeOverflow(size));
                    }
                    self.buffer.resize(length, 0);
                }
                self.length = Some(length);
                length
            }
        };

        while self.filled < length {
            match source.read_into(&mut self.buffer[self.filled..length]) {
                Ok(0) => return DecodeState::processing("Reading sized content"),
                Ok(n) => self.filled += n,
                Err(err) => return DecodeState::Error(err),
            }
        }

        self.length = None;
        self.filled = 0;
        match self.convert.convert(&self.buffer[..length]) {
            Ok(value) => DecodeState::done(value),
            Err(err) => DecodeState::Error(err),
        }
    }

    fn reset(&mut self) {
        self.size.reset();
        self.length = None;
        self.filled = 0;
    }
}

#[derive(Debug, Clone)]
enum End {
    Sequence(Box<[u8]>),
    Predicate(fn(u8) -> bool),
}

/// Decoder for content followed by an end marker.
///
/// Reads one byte at a time until the buffered bytes end with the marker (or a
/// byte satisfies the predicate). The terminal unit is dropped unless
/// [`keep_marker`](Self::keep_marker) is set.
#[derive(Debug, Clone)]
pub struct MarkerDecoder<C> {
    end: End,
    keep: bool,
    convert: C,
    buffer: Vec<u8>,
}

impl<C> MarkerDecoder<C> {
    /// End at the first occurrence of `marker`.
    pub fn new(marker: impl Into<Box<[u8]>>, convert: C) -> Result<Self, BuildError> {
        let marker = marker.into();
        if marker.is_empty() {
            Err(BuildError::EmptyMarker)?;
        }
        Ok(Self::with_end(End::Sequence(marker), convert))
    }

    /// End at the first byte satisfying `predicate`.
    pub fn until(predicate: fn(u8) -> bool, convert: C) -> Self {
        Self::with_end(End::Predicate(predicate), convert)
    }

    /// Include the terminal unit in the converted bytes.
    pub fn keep_marker(mut self) -> Self {
        self.keep = true;
        self
    }

    fn with_end(end: End, convert: C) -> Self {
        Self {
            end,
            keep: false,
            convert,
            buffer: Vec::new(),
        }
    }
}

/// A string followed by `marker`.
pub fn marker_string(
    marker: impl Into<Box<[u8]>>,
    charset: Charset,
    order: Endianness,
) -> Result<MarkerDecoder<Text>, BuildError> {
    MarkerDecoder::new(marker, Text { charset, order })
}

impl<C: Convert<T>, T> Decoder<T> for MarkerDecoder<C> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<T> {
        let terminal = loop {
            let byte = match source.read() {
                Ok(Some(byte)) => byte,
                Ok(None) => return DecodeState::processing("Awaiting end marker"),
                Err(err) => return DecodeState::Error(err),
            };
            self.buffer.push(byte);
            match &self.end {
                End::Sequence(marker) if self.buffer.ends_with(marker) => break marker.len(),
                End::Predicate(predicate) if predicate(byte) => break 1,
                _ => {}
            }
        };

        let end = if self.keep {
            self.buffer.len()
        } else {
            self.buffer.len() - terminal
        };
        let result = self.convert.convert(&self.buffer[..end]);
        self.buffer.clear();
        match result {
            Ok(value) => DecodeState::done(value),
            Err(err) => DecodeState::Error(err),
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// The string decoder described by a [`Config`].
#[derive(Debug, Clone)]
pub enum TextDecoder {
    Prefixed(StringDecoder),
    Marker(MarkerDecoder<Text>),
}

/// Create the string decoder described by `config`.
pub fn text(config: &Config) -> TextDecoder {
    let convert = Text {
        charset: config.charset,
        order: config.endianness,
    };
    match config.framing {
        Framing::Prefixed => {
            TextDecoder::Prefixed(PrefixedDecoder::new(FixedDecoder::new(config.endianness), convert))
        }
        Framing::Marker(marker) => TextDecoder::Marker(MarkerDecoder::with_end(
            End::Sequence(Marker::bytes(marker).into()),
            convert,
        )),
    }
}

impl Decoder<String> for TextDecoder {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<String> {
        match self {
            Self::Prefixed(decoder) => decoder.decode(source),
            Self::Marker(decoder) => decoder.decode(source),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Prefixed(decoder) => decoder.reset(),
            Self::Marker(decoder) => decoder.reset(),
        }
    }
}

/// Decoder discarding a fixed number of bytes.
#[derive(Debug, Clone)]
pub struct Skip {
    count: u64,
    remaining: u64,
}

impl Skip {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            remaining: count,
        }
    }
}

impl Decoder<()> for Skip {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<()> {
        while self.remaining > 0 {
            match source.skip(self.remaining) {
                Ok(0) => return DecodeState::processing("Skipping bytes"),
                Ok(n) => self.remaining -= n,
                Err(err) => return DecodeState::Error(err),
            }
        }
        self.remaining = self.count;
        DecodeState::done(())
    }

    fn reset(&mut self) {
        self.remaining = self.count;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::decode::fixed;

    #[test]
    fn prefixed_string_across_fragments() {
        let mut decoder = string(Endianness::Big);
        assert!(decoder.decode_slice(&[0, 0]).is_processing());
        assert!(decoder.decode_slice(&[0, 3, b'a']).is_processing());
        assert_eq!(decoder.decode_slice(&[b'b', b'c']).into_value(), Some("abc".into()));
        assert_eq!(decoder.decode_slice(&[0, 0, 0, 0]).into_value(), Some(String::new()));
    }

    #[test]
    fn negative_size_is_an_error() {
        let mut decoder = string(Endianness::Big);
        let state = decoder.decode_slice(&[0xff, 0xff, 0xff, 0xfe, b'x']);
        assert!(matches!(state, DecodeState::Error(DecodeError::NegativeSize(-2))));
        decoder.reset();
        assert_eq!(decoder.decode_slice(&[0, 0, 0, 1, b'x']).into_value(), Some("x".into()));
    }

    #[test]
    fn buffer_is_reused_between_values() {
        let mut decoder = bytes(fixed::<u8>(Endianness::Big));
        assert_eq!(decoder.decode_slice(&[3, 1, 2, 3]).into_value(), Some(vec![1, 2, 3]));
        assert_eq!(decoder.decode_slice(&[1, 9]).into_value(), Some(vec![9]));
        assert_eq!(decoder.buffer.len(), 3);
    }

    #[test]
    fn size_prefix_may_be_narrow() {
        let mut decoder = string_with(fixed::<u16>(Endianness::Little), Charset::Ascii, Endianness::Little);
        assert_eq!(decoder.decode_slice(&[2, 0, b'o', b'k']).into_value(), Some("ok".into()));
    }

    #[test]
    fn marker_sequence_spans_reads() {
        let mut decoder = marker_string(&b"\r\n"[..], Charset::Utf8, Endianness::Big).unwrap();
        assert!(decoder.decode_slice(b"hi\r").is_processing());
        let mut source: &[u8] = b"\nrest";
        assert_eq!(decoder.decode(&mut source).into_value(), Some("hi".into()));
        assert_eq!(source, b"rest");
    }

    #[test]
    fn marker_can_be_kept() {
        let mut decoder = MarkerDecoder::until(|b| b == b';', Raw).keep_marker();
        assert_eq!(decoder.decode_slice(b"ab;c").into_value(), Some(b"ab;".to_vec()));
        assert_eq!(
            MarkerDecoder::new(Vec::<u8>::new(), Raw).map(|_| ()),
            Err(BuildError::EmptyMarker)
        );
    }

    #[test]
    fn configured_text_uses_marker_framing() {
        let marker = Marker::new(b"\0").unwrap();
        let config = Config::new().with_framing(Framing::Marker(marker));
        assert_eq!(text(&config).decode_slice(b"nul\0").into_value(), Some("nul".into()));
    }

    #[test]
    fn skip_resumes() {
        let mut decoder = Skip::new(3);
        let mut source: &[u8] = &[1, 2];
        assert!(decoder.decode(&mut source).is_processing());
        let mut source: &[u8] = &[3, 4];
        assert!(decoder.decode(&mut source).is_done());
        assert_eq!(source, [4]);
    }
}
