use alloc::{boxed::Box, collections::VecDeque, vec::Vec};

use bytes::{Buf, Bytes, BytesMut};

use crate::error::DecodeError;

/// A pull-based provider of bytes.
///
/// Every operation is best-effort: a source with nothing to offer at the
/// moment returns `None` or a short count rather than blocking. A source is
/// consumed by one decode chain at a time.
pub trait ByteSource {
    /// Read one byte, or `None` if no byte is currently available.
    fn read(&mut self) -> Result<Option<u8>, DecodeError>;

    /// Read up to `buf.len()` bytes, returning how many were read (possibly
    /// zero).
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut count = 0;
        while count < buf.len() {
            let Some(byte) = self.read()? else { break };
            buf[count] = byte;
            count += 1;
        }
        Ok(count)
    }

    /// Append up to `max` bytes to `out`, returning how many were appended.
    fn read_to_vec(&mut self, out: &mut Vec<u8>, max: usize) -> Result<usize, DecodeError> {
        let mut chunk = [0; 64];
        let mut count = 0;
        while count < max {
            let wanted = chunk.len().min(max - count);
            let n = self.read_into(&mut chunk[..wanted])?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            count += n;
        }
        Ok(count)
    }

    /// Discard up to `count` bytes, returning how many were discarded.
    fn skip(&mut self, count: u64) -> Result<u64, DecodeError> {
        let mut skipped = 0;
        while skipped < count && self.read()?.is_some() {
            skipped += 1;
        }
        Ok(skipped)
    }
}

macro_rules! buf_source {
    ($($t:ty),* $(,)?) => {$(
        impl ByteSource for $t {
            fn read(&mut self) -> Result<Option<u8>, DecodeError> {
                Ok(self.has_remaining().then(|| self.get_u8()))
            }

            fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
                let n = buf.len().min(self.remaining());
                self.copy_to_slice(&mut buf[..n]);
                Ok(n)
            }

            fn skip(&mut self, count: u64) -> Result<u64, DecodeError> {
                let n = usize::try_from(count).unwrap_or(usize::MAX).min(self.remaining());
                self.advance(n);
                Ok(n as u64)
            }
        }
    )*};
}

buf_source!(&[u8], Bytes, BytesMut);

/// A buffer filled by a producer at the back and drained by a decoder at the
/// front.
impl ByteSource for VecDeque<u8> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        Ok(self.pop_front())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let n = buf.len().min(self.len());
        for (dst, src) in buf.iter_mut().zip(self.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn skip(&mut self, count: u64) -> Result<u64, DecodeError> {
        let n = usize::try_from(count).unwrap_or(usize::MAX).min(self.len());
        self.drain(..n);
        Ok(n as u64)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        (**self).read()
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        (**self).read_into(buf)
    }

    fn read_to_vec(&mut self, out: &mut Vec<u8>, max: usize) -> Result<usize, DecodeError> {
        (**self).read_to_vec(out, max)
    }

    fn skip(&mut self, count: u64) -> Result<u64, DecodeError> {
        (**self).skip(count)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        (**self).read()
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        (**self).read_into(buf)
    }

    fn read_to_vec(&mut self, out: &mut Vec<u8>, max: usize) -> Result<usize, DecodeError> {
        (**self).read_to_vec(out, max)
    }

    fn skip(&mut self, count: u64) -> Result<u64, DecodeError> {
        (**self).skip(count)
    }
}

/// A source backed by a callback returning the next byte, if any.
///
/// Created with [`from_fn`].
#[derive(Debug, Clone)]
pub struct FnSource<F>(F);

/// Create a source that calls `f` for every byte.
pub fn from_fn<F: FnMut() -> Option<u8>>(f: F) -> FnSource<F> {
    FnSource(f)
}

impl<F: FnMut() -> Option<u8>> ByteSource for FnSource<F> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        Ok((self.0)())
    }
}

/// A source reading from a blocking stream.
///
/// End of stream and [`WouldBlock`](std::io::ErrorKind::WouldBlock) both read
/// as "no byte available". Interrupted reads are retried; any other failure
/// becomes [`DecodeError::Io`].
///
/// _Requires Cargo feature `std`._
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
impl<R: std::io::Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for StreamSource<R> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut byte = [0];
        Ok((self.read_into(&mut byte)? == 1).then_some(byte[0]))
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        use std::io::ErrorKind;

        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(0),
                Err(err) => Err(err)?,
            }
        }
    }
}

/// A source adapter reading individual bits, most significant first.
///
/// Whole-byte reads through [`ByteSource`] stay bit-aligned with earlier bit
/// reads: after three bits, the next "byte" is made of the following eight
/// bits.
#[derive(Debug)]
pub struct BitReader<S> {
    inner: S,
    pending: u8,
    count: u8,
}

impl<S: ByteSource> BitReader<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            pending: 0,
            count: 0,
        }
    }

    /// Read one bit, or `None` if the source has no byte available.
    pub fn read_bit(&mut self) -> Result<Option<bool>, DecodeError> {
        if self.count == 0 {
            let Some(byte) = self.inner.read()? else {
                return Ok(None);
            };
            self.pending = byte;
            self.count = 8;
        }
        let bit = self.pending & 0x80 != 0;
        self.pending <<= 1;
        self.count -= 1;
        Ok(Some(bit))
    }

    /// Read up to `len` bits into `buf`, starting at bit offset `start`.
    ///
    /// Returns the number of bits read. Bits of `buf` outside the written range
    /// are left untouched.
    pub fn read_bits(
        &mut self,
        buf: &mut [u8],
        start: usize,
        len: usize,
    ) -> Result<usize, DecodeError> {
        let end = start.saturating_add(len).min(buf.len() * 8);
        let mut position = start;
        while position < end {
            let Some(bit) = self.read_bit()? else { break };
            let mask = 0x80 >> (position % 8);
            if bit {
                buf[position / 8] |= mask;
            } else {
                buf[position / 8] &= !mask;
            }
            position += 1;
        }
        Ok(position.saturating_sub(start))
    }

    /// Drop any buffered bits of a partially read byte.
    pub fn align(&mut self) {
        self.pending = 0;
        self.count = 0;
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteSource> ByteSource for BitReader<S> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        if self.count == 0 {
            return self.inner.read();
        }
        let Some(next) = self.inner.read()? else {
            return Ok(None);
        };
        let byte = self.pending | (next >> self.count);
        self.pending = next << (8 - self.count);
        Ok(Some(byte))
    }
}
