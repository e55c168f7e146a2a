use alloc::{boxed::Box, vec::Vec};

use bytes::BytesMut;

use crate::error::EncodeError;

/// A consumer of bytes supporting bit-granular writes.
///
/// Bits are packed most significant first. A partially filled byte is held
/// back until eight bits are available or [`flush`](Self::flush) pads it with
/// zero bits.
pub trait ByteSink {
    /// Write a single bit.
    fn write_bit(&mut self, bit: bool) -> Result<(), EncodeError>;

    /// Write a whole byte.
    fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError>;

    /// Write a run of whole bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }

    /// Pad any partial byte with zero bits, emit it, and flush the underlying
    /// output.
    fn flush(&mut self) -> Result<(), EncodeError>;

    /// Write `len` bits of `byte`, starting `start` bits from its most
    /// significant end.
    fn write_bits_of(&mut self, byte: u8, start: u8, len: u8) -> Result<(), EncodeError> {
        check_range(1, usize::from(start), usize::from(len))?;
        (start..start + len).try_for_each(|i| self.write_bit(byte & (0x80 >> i) != 0))
    }

    /// Write `len` bits of `bytes`, starting at bit offset `start`.
    ///
    /// The range is split into an unaligned prefix inside the first byte,
    /// whole bytes, and an unaligned suffix inside the last byte.
    fn write_bits(&mut self, bytes: &[u8], start: usize, len: usize) -> Result<(), EncodeError> {
        check_range(bytes.len(), start, len)?;

        let mut index = start / 8;
        let mut remaining = len;

        let offset = (start % 8) as u8;
        if offset != 0 && remaining != 0 {
            let n = (8 - usize::from(offset)).min(remaining);
            self.write_bits_of(bytes[index], offset, n as u8)?;
            remaining -= n;
            index += 1;
        }

        let whole = remaining / 8;
        self.write_bytes(&bytes[index..index + whole])?;
        index += whole;
        remaining %= 8;

        if remaining != 0 {
            self.write_bits_of(bytes[index], 0, remaining as u8)?;
        }

        Ok(())
    }
}

fn check_range(bytes: usize, start: usize, len: usize) -> Result<(), EncodeError> {
    let available = bytes * 8;
    if start.checked_add(len).is_none_or(|end| end > available) {
        Err(EncodeError::BitRange {
            start,
            len,
            available,
        })?;
    }
    Ok(())
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_bit(&mut self, bit: bool) -> Result<(), EncodeError> {
        (**self).write_bit(bit)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError> {
        (**self).write_byte(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        (**self).write_bytes(bytes)
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        (**self).flush()
    }

    fn write_bits_of(&mut self, byte: u8, start: u8, len: u8) -> Result<(), EncodeError> {
        (**self).write_bits_of(byte, start, len)
    }

    fn write_bits(&mut self, bytes: &[u8], start: usize, len: usize) -> Result<(), EncodeError> {
        (**self).write_bits(bytes, start, len)
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn write_bit(&mut self, bit: bool) -> Result<(), EncodeError> {
        (**self).write_bit(bit)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError> {
        (**self).write_byte(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        (**self).write_bytes(bytes)
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        (**self).flush()
    }

    fn write_bits_of(&mut self, byte: u8, start: u8, len: u8) -> Result<(), EncodeError> {
        (**self).write_bits_of(byte, start, len)
    }

    fn write_bits(&mut self, bytes: &[u8], start: usize, len: usize) -> Result<(), EncodeError> {
        (**self).write_bits(bytes, start, len)
    }
}

/// A destination for whole bytes, wrapped by a [`BitWriter`].
pub trait ByteOutput {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError>;

    fn flush(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }
}

impl ByteOutput for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl ByteOutput for BytesMut {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<O: ByteOutput + ?Sized> ByteOutput for &mut O {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        (**self).put(bytes)
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        (**self).flush()
    }
}

/// An output handing every byte to a callback.
#[derive(Debug, Clone)]
pub struct FnOutput<F>(pub F);

impl<F: FnMut(u8)> ByteOutput for FnOutput<F> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        bytes.iter().for_each(|&b| (self.0)(b));
        Ok(())
    }
}

/// An output dropping everything written to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl ByteOutput for Discard {
    fn put(&mut self, _bytes: &[u8]) -> Result<(), EncodeError> {
        Ok(())
    }
}

#[cfg(feature = "std")]
extern crate std;

/// An output writing to a blocking stream.
///
/// _Requires Cargo feature `std`._
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StreamOutput<W>(pub W);

#[cfg(feature = "std")]
impl<W: std::io::Write> ByteOutput for StreamOutput<W> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        Ok(self.0.write_all(bytes)?)
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        Ok(self.0.flush()?)
    }
}

/// A [`ByteSink`] packing bits into whole bytes for a [`ByteOutput`].
///
/// Bytes written while no partial byte is pending go straight to the output.
#[derive(Debug, Default)]
pub struct BitWriter<O> {
    output: O,
    // Pending bits, most significant first; unused low bits are zero.
    acc: u8,
    count: u8,
}

impl<O: ByteOutput> BitWriter<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            acc: 0,
            count: 0,
        }
    }

    /// Number of bits waiting for a full byte.
    pub fn pending_bits(&self) -> u8 {
        self.count
    }

    pub fn get_ref(&self) -> &O {
        &self.output
    }

    /// Recover the output, discarding any unflushed bits.
    pub fn into_inner(self) -> O {
        self.output
    }

    // `value` holds `len` bits at its most significant end.
    fn push(&mut self, value: u8, len: u8) -> Result<(), EncodeError> {
        let window = (u16::from(self.acc) << 8) | (u16::from(value) << (8 - self.count));
        let total = self.count + len;
        if total >= 8 {
            self.output.put(&[(window >> 8) as u8])?;
            self.acc = window as u8;
            self.count = total - 8;
        } else {
            self.acc = (window >> 8) as u8;
            self.count = total;
        }
        Ok(())
    }
}

impl<O: ByteOutput> ByteSink for BitWriter<O> {
    fn write_bit(&mut self, bit: bool) -> Result<(), EncodeError> {
        self.push(if bit { 0x80 } else { 0 }, 1)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError> {
        if self.count == 0 {
            self.output.put(&[byte])
        } else {
            self.push(byte, 8)
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if self.count == 0 {
            self.output.put(bytes)
        } else {
            bytes.iter().try_for_each(|&b| self.push(b, 8))
        }
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        if self.count != 0 {
            self.output.put(&[self.acc])?;
            self.acc = 0;
            self.count = 0;
        }
        self.output.flush()
    }

    fn write_bits_of(&mut self, byte: u8, start: u8, len: u8) -> Result<(), EncodeError> {
        check_range(1, usize::from(start), usize::from(len))?;
        if len == 0 {
            return Ok(());
        }
        let value = (byte << start) & (0xff << (8 - len));
        self.push(value, len)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn written(f: impl FnOnce(&mut BitWriter<Vec<u8>>) -> Result<(), EncodeError>) -> Vec<u8> {
        let mut sink = BitWriter::new(Vec::new());
        f(&mut sink).unwrap();
        sink.flush().unwrap();
        sink.into_inner()
    }

    #[test]
    fn single_bits_pack_from_the_top() {
        let bytes = written(|s| {
            [true, false, true, true]
                .into_iter()
                .try_for_each(|b| s.write_bit(b))
        });
        assert_eq!(bytes, [0b1011_0000]);
    }

    #[test]
    fn seven_zeros_then_one() {
        let bytes = written(|s| {
            (0..7).try_for_each(|_| s.write_bit(false))?;
            s.write_bit(true)
        });
        assert_eq!(bytes, [0b0000_0001]);
    }

    #[test]
    fn bit_range_inside_one_byte() {
        let bytes = written(|s| s.write_bits(&[0b1011_1111], 1, 5));
        assert_eq!(bytes, [0b0111_1000]);
    }

    #[test]
    fn flush_without_pending_bits_emits_nothing() {
        assert!(written(|_| Ok(())).is_empty());
        assert_eq!(written(|s| s.write_byte(0xab)), [0xab]);
    }

    #[test]
    fn unaligned_bytes_straddle_the_accumulator() {
        let bytes = written(|s| {
            s.write_bit(true)?;
            s.write_bytes(&[0xff, 0x00])?;
            s.write_byte(0b1000_0001)
        });
        assert_eq!(bytes, [0b1111_1111, 0b1000_0000, 0b0100_0000, 0b1000_0000]);
    }

    // Reference: copy bit by bit.
    fn naive(bytes: &[u8], start: usize, len: usize) -> Vec<u8> {
        written(|s| {
            (start..start + len).try_for_each(|i| s.write_bit(bytes[i / 8] & (0x80 >> (i % 8)) != 0))
        })
    }

    #[test]
    fn three_region_split_matches_bitwise_copy() {
        let source = [0b1100_1010, 0b0110_1001, 0b1111_0000, 0b0101_0101];
        // Aligned and unaligned starts; zero, one and many whole bytes; with
        // and without a suffix.
        let cases = [
            (0, 0),
            (0, 8),
            (0, 16),
            (0, 13),
            (0, 32),
            (3, 0),
            (3, 5),
            (3, 2),
            (3, 13),
            (3, 21),
            (3, 29),
            (7, 1),
            (7, 9),
            (8, 24),
            (9, 23),
            (12, 4),
        ];
        for (start, len) in cases {
            let split = written(|s| s.write_bits(&source, start, len));
            assert_eq!(split, naive(&source, start, len), "start {start}, len {len}");
        }
    }

    #[test]
    fn split_respects_pending_bits() {
        let source = [0b1010_1010, 0b1100_1100];
        let bytes = written(|s| {
            s.write_bits_of(0b1110_0000, 0, 3)?;
            s.write_bits(&source, 2, 12)
        });
        let mut expected = BitWriter::new(Vec::new());
        for i in 0..3 {
            expected.write_bit(0b1110_0000u8 & (0x80 >> i) != 0).unwrap();
        }
        for i in 2..14 {
            expected.write_bit(source[i / 8] & (0x80 >> (i % 8)) != 0).unwrap();
        }
        expected.flush().unwrap();
        assert_eq!(bytes, expected.into_inner());
    }

    #[test]
    fn out_of_range_bits_are_rejected() {
        let mut sink = BitWriter::new(Vec::new());
        assert!(matches!(
            sink.write_bits(&[0, 0], 10, 7),
            Err(EncodeError::BitRange { available: 16, .. })
        ));
        assert!(matches!(
            sink.write_bits_of(0, 6, 3),
            Err(EncodeError::BitRange { .. })
        ));
        assert_eq!(sink.pending_bits(), 0);
    }

    #[test]
    fn callback_output_sees_every_byte() {
        let mut seen = vec![];
        let mut sink = BitWriter::new(FnOutput(|b: u8| seen.push(b)));
        sink.write_bytes(&[1, 2]).unwrap();
        sink.write_bit(true).unwrap();
        sink.flush().unwrap();
        drop(sink);
        assert_eq!(seen, [1, 2, 0x80]);
    }
}
