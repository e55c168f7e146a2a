use core::marker::PhantomData;

use crate::{
    collect::Collector,
    decode::{Decoder, DecoderExt, Map, Optional, PrefixedRepeat, Repeat, Skip, UntilRepeat},
};

/// A typed builder chaining decoders one after another.
///
/// Each step combines the value decoded so far with the next one, so the
/// final decoder is an ordinary nest of adapters with no dynamic dispatch.
///
/// ```
/// use cassette::{Endianness, compose::Composer, decode::{fixed, string}};
///
/// let decoder = Composer::new(string(Endianness::Big))
///     .skip(2)
///     .then(fixed::<u32>(Endianness::Big), |name, id| (id, name))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct Composer<D, T> {
    decoder: D,
    _phantom: PhantomData<fn() -> T>,
}

impl<D: Decoder<T>, T> Composer<D, T> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            _phantom: PhantomData,
        }
    }

    /// Decode `next` after the current value and combine both with `f`.
    pub fn then<N, U, R, F>(self, next: N, mut f: F) -> Composer<impl Decoder<R>, R>
    where
        N: Decoder<U>,
        F: FnMut(T, U) -> R,
    {
        Composer::new(self.decoder.zip(next).map(move |(value, other)| f(value, other)))
    }

    /// Decode `next` after the current value and discard its result.
    pub fn then_skip<N, U>(self, next: N) -> Composer<impl Decoder<T>, T>
    where
        N: Decoder<U>,
    {
        Composer::new(self.decoder.zip(next).map(|(value, _)| value))
    }

    /// Discard `count` bytes after the current value.
    pub fn skip(self, count: u64) -> Composer<impl Decoder<T>, T> {
        self.then_skip(Skip::new(count))
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Composer<Map<D, T, F>, U> {
        Composer::new(self.decoder.map(f))
    }

    /// Precede everything built so far with a presence flag.
    pub fn optional(self) -> Composer<Optional<D, T>, Option<T>> {
        Composer::new(self.decoder.optional())
    }

    /// Decode everything built so far exactly `count` times.
    pub fn repeat<C: Collector<T>>(self, count: usize, collector: C) -> Composer<Repeat<D, T, C>, C::Output> {
        Composer::new(self.decoder.repeat(count, collector))
    }

    /// Decode everything built so far as many times as a count read with
    /// `size` says.
    pub fn repeat_prefixed<S, N, C>(
        self,
        size: S,
        collector: C,
    ) -> Composer<PrefixedRepeat<S, N, D, T, C>, C::Output>
    where
        S: Decoder<N>,
        N: Into<i64>,
        C: Collector<T>,
    {
        Composer::new(self.decoder.repeat_prefixed(size, collector))
    }

    /// Decode everything built so far until a value satisfies `predicate`.
    pub fn repeat_until<C, P>(
        self,
        predicate: P,
        keep_last: bool,
        collector: C,
    ) -> Composer<UntilRepeat<D, T, C, P>, C::Output>
    where
        C: Collector<T>,
        P: FnMut(&T) -> bool,
    {
        Composer::new(self.decoder.repeat_until(predicate, keep_last, collector))
    }

    /// The composed decoder. With no steps added, this is the decoder the
    /// composer was created with.
    pub fn build(self) -> D {
        self.decoder
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec, vec::Vec};

    use super::*;
    use crate::{
        collect::to_vec,
        config::Endianness,
        decode::{FixedDecoder, fixed, string},
    };

    #[test]
    fn a_single_step_builds_to_itself() {
        let mut decoder: FixedDecoder<u16> = Composer::new(fixed::<u16>(Endianness::Little)).build();
        assert_eq!(decoder.decode_slice(&[1, 2]).into_value(), Some(0x0201));
    }

    #[test]
    fn steps_run_in_order() {
        let mut decoder = Composer::new(string(Endianness::Big))
            .skip(2)
            .then(fixed::<u8>(Endianness::Big), |name, id| (id, name))
            .build();
        let bytes = [0, 0, 0, 1, b'n', 0xee, 0xee, 7];
        assert_eq!(decoder.decode_slice(&bytes).into_value(), Some((7, String::from("n"))));
    }

    #[test]
    fn repeated_records_resume() {
        let mut decoder = Composer::new(fixed::<u8>(Endianness::Big))
            .then_skip(fixed::<u8>(Endianness::Big))
            .map(u16::from)
            .repeat_prefixed(fixed::<u8>(Endianness::Big), to_vec())
            .optional()
            .build();
        assert!(decoder.decode_slice(&[1, 2, 5, 0]).is_processing());
        assert_eq!(decoder.decode_slice(&[6, 0]).into_value(), Some(Some(vec![5, 6])));
        assert_eq!(decoder.decode_slice(&[0]).into_value(), Some(None));
    }

    #[test]
    fn terminated_records() {
        let mut decoder = Composer::new(fixed::<u8>(Endianness::Big))
            .repeat_until(|&b| b == b'.', false, to_vec())
            .map(|bytes: Vec<u8>| bytes.len())
            .repeat(2, to_vec())
            .build();
        assert_eq!(decoder.decode_slice(b"ab.c.").into_value(), Some(vec![2, 1]));
    }
}
