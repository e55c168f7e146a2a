//! Wire layout choices shared by the default codecs.

use alloc::{string::String, vec::Vec};

use crate::error::{BuildError, DecodeError, EncodeError};

/// Byte order of multi-byte primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Most significant byte first (default).
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

/// Character encoding of strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    /// UTF-8 (default).
    #[default]
    Utf8,
    /// UTF-16, in the configured byte order.
    Utf16,
    /// Seven-bit ASCII.
    Ascii,
}

impl Charset {
    /// Convert encoded bytes to a string.
    pub fn decode(self, bytes: &[u8], order: Endianness) -> Result<String, DecodeError> {
        match self {
            Self::Utf8 => Ok(String::from_utf8(bytes.to_vec())?),
            Self::Ascii => {
                if let Some(&byte) = bytes.iter().find(|b| !b.is_ascii()) {
                    Err(DecodeError::NonAscii(byte))?;
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
            Self::Utf16 => {
                if bytes.len() % 2 != 0 {
                    Err(DecodeError::Utf16)?;
                }
                let units = bytes.chunks_exact(2).map(|c| match order {
                    Endianness::Big => u16::from_be_bytes([c[0], c[1]]),
                    Endianness::Little => u16::from_le_bytes([c[0], c[1]]),
                });
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|_| DecodeError::Utf16)
            }
        }
    }

    /// Convert a string to encoded bytes.
    pub fn encode(self, text: &str, order: Endianness) -> Result<Vec<u8>, EncodeError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Ascii => {
                if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
                    Err(EncodeError::NonAscii(c))?;
                }
                Ok(text.as_bytes().to_vec())
            }
            Self::Utf16 => Ok(text
                .encode_utf16()
                .flat_map(|unit| match order {
                    Endianness::Big => unit.to_be_bytes(),
                    Endianness::Little => unit.to_le_bytes(),
                })
                .collect()),
        }
    }
}

/// A non-empty end marker with static lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Marker(&'static [u8]);

impl Marker {
    /// Wrap a byte sequence, rejecting an empty one.
    pub const fn new(bytes: &'static [u8]) -> Result<Self, BuildError> {
        if bytes.is_empty() {
            Err(BuildError::EmptyMarker)
        } else {
            Ok(Self(bytes))
        }
    }

    /// The marker's bytes.
    pub const fn bytes(self) -> &'static [u8] {
        self.0
    }
}

/// How the default string codecs delimit a string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Framing {
    /// Preceded by its encoded length as a four-byte signed integer (default).
    #[default]
    Prefixed,
    /// Followed by an end marker.
    Marker(Marker),
}

/// Layout of the default primitive codecs used by composed decoders and
/// encoders.
///
/// The default configuration is big-endian with UTF-8 strings prefixed by a
/// four-byte signed length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Config {
    pub endianness: Endianness,
    pub charset: Charset,
    pub framing: Framing,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            endianness: Endianness::Big,
            charset: Charset::Utf8,
            framing: Framing::Prefixed,
        }
    }

    pub const fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub const fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub const fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_follows_byte_order() {
        let big = Charset::Utf16.encode("hé", Endianness::Big).unwrap();
        assert_eq!(big, [0x00, b'h', 0x00, 0xe9]);
        let little = Charset::Utf16.encode("hé", Endianness::Little).unwrap();
        assert_eq!(little, [b'h', 0x00, 0xe9, 0x00]);
        assert_eq!(Charset::Utf16.decode(&little, Endianness::Little).unwrap(), "hé");
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert!(matches!(
            Charset::Ascii.decode(&[b'a', 0x80], Endianness::Big),
            Err(DecodeError::NonAscii(0x80))
        ));
        assert!(matches!(
            Charset::Ascii.encode("é", Endianness::Big),
            Err(EncodeError::NonAscii('é'))
        ));
    }

    #[test]
    fn empty_marker_is_rejected() {
        assert_eq!(Marker::new(b""), Err(BuildError::EmptyMarker));
        assert_eq!(Marker::new(b"\0").map(Marker::bytes), Ok(&b"\0"[..]));
    }
}
