use alloc::boxed::Box;
use core::marker::PhantomData;

use either::Either::{Left, Right};

use super::{DecodeState, Decoder, FixedDecoder, PrefixedRepeat, Repeat, UntilRepeat};
use crate::{collect::Collector, error::DecodeError, io::ByteSource};

/// Combinators available on every [`Decoder`].
pub trait DecoderExt<T>: Decoder<T> + Sized {
    /// Transform each decoded value.
    fn map<U, F: FnMut(T) -> U>(self, f: F) -> Map<Self, T, F> {
        Map {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Transform each decoded value on first access to the result.
    fn map_lazy<U, F>(self, f: F) -> MapLazy<Self, T, F>
    where
        T: 'static,
        F: Fn(T) -> U + Clone + 'static,
    {
        MapLazy {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Transform each decoded value with a conversion that may reject it.
    fn try_map<U, F: FnMut(T) -> Result<U, DecodeError>>(self, f: F) -> TryMap<Self, T, F> {
        TryMap {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Transform every state the decoder reports, including `Processing` and
    /// `Error`.
    fn map_state<U, F: FnMut(DecodeState<T>) -> DecodeState<U>>(
        self,
        f: F,
    ) -> MapState<Self, T, F> {
        MapState {
            inner: self,
            f,
            _phantom: PhantomData,
        }
    }

    /// Decode a value, then decode with the decoder it selects.
    fn and_then<U, D: Decoder<U>, F: FnMut(T) -> D>(self, f: F) -> AndThen<Self, T, D, F> {
        AndThen {
            inner: self,
            f,
            next: None,
            _phantom: PhantomData,
        }
    }

    /// Decode a one-byte presence flag, then the value if present.
    fn optional(self) -> Optional<Self, T> {
        Optional {
            flag: FixedDecoder::default(),
            present: None,
            inner: self,
            _phantom: PhantomData,
        }
    }

    /// Decode this value, then another.
    fn zip<U, D: Decoder<U>>(self, other: D) -> Zip<Self, T, D, U> {
        Zip {
            first: self,
            second: other,
            value: None,
            _phantom: PhantomData,
        }
    }

    /// Decode exactly `count` values.
    fn repeat<C: Collector<T>>(self, count: usize, collector: C) -> Repeat<Self, T, C> {
        Repeat::new(self, count, collector)
    }

    /// Decode as many values as a count read with `size` says.
    fn repeat_prefixed<S, N, C>(self, size: S, collector: C) -> PrefixedRepeat<S, N, Self, T, C>
    where
        S: Decoder<N>,
        N: Into<i64>,
        C: Collector<T>,
    {
        PrefixedRepeat::new(size, self, collector)
    }

    /// Decode values until one satisfies `predicate`.
    fn repeat_until<C, P>(self, predicate: P, keep_last: bool, collector: C) -> UntilRepeat<Self, T, C, P>
    where
        C: Collector<T>,
        P: FnMut(&T) -> bool,
    {
        UntilRepeat::new(self, predicate, keep_last, collector)
    }

    fn boxed<'a>(self) -> Box<dyn Decoder<T> + 'a>
    where
        Self: 'a,
    {
        Box::new(self)
    }
}

impl<T, D: Decoder<T>> DecoderExt<T> for D {}

/// See [`DecoderExt::map`].
#[derive(Debug, Clone)]
pub struct Map<D, T, F> {
    inner: D,
    f: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<D: Decoder<T>, T, U, F: FnMut(T) -> U> Decoder<U> for Map<D, T, F> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<U> {
        self.inner.decode(source).map(&mut self.f)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// See [`DecoderExt::map_lazy`].
#[derive(Debug, Clone)]
pub struct MapLazy<D, T, F> {
    inner: D,
    f: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<D, T, U, F> Decoder<U> for MapLazy<D, T, F>
where
    D: Decoder<T>,
    T: 'static,
    F: Fn(T) -> U + Clone + 'static,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<U> {
        match self.inner.decode(source).split() {
            Left(done) => DecodeState::Done(done.map(self.f.clone())),
            Right(state) => state,
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// See [`DecoderExt::try_map`].
#[derive(Debug, Clone)]
pub struct TryMap<D, T, F> {
    inner: D,
    f: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<D, T, U, F> Decoder<U> for TryMap<D, T, F>
where
    D: Decoder<T>,
    F: FnMut(T) -> Result<U, DecodeError>,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<U> {
        self.inner.decode(source).and_then(&mut self.f)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// See [`DecoderExt::map_state`].
#[derive(Debug, Clone)]
pub struct MapState<D, T, F> {
    inner: D,
    f: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<D, T, U, F> Decoder<U> for MapState<D, T, F>
where
    D: Decoder<T>,
    F: FnMut(DecodeState<T>) -> DecodeState<U>,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<U> {
        (self.f)(self.inner.decode(source))
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

/// See [`DecoderExt::and_then`].
#[derive(Debug, Clone)]
pub struct AndThen<D, T, N, F> {
    inner: D,
    f: F,
    next: Option<N>,
    _phantom: PhantomData<fn() -> T>,
}

impl<D, T, U, N, F> Decoder<U> for AndThen<D, T, N, F>
where
    D: Decoder<T>,
    N: Decoder<U>,
    F: FnMut(T) -> N,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<U> {
        let mut next = match self.next.take() {
            Some(next) => next,
            None => match self.inner.decode(source).split() {
                Left(done) => (self.f)(done.into_inner()),
                Right(state) => return state,
            },
        };
        let state = next.decode(source);
        if !state.is_done() {
            self.next = Some(next);
        }
        state
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.next = None;
    }
}

/// See [`DecoderExt::optional`].
#[derive(Debug, Clone)]
pub struct Optional<D, T> {
    flag: FixedDecoder<bool>,
    present: Option<bool>,
    inner: D,
    _phantom: PhantomData<fn() -> T>,
}

impl<D: Decoder<T>, T> Decoder<Option<T>> for Optional<D, T> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<Option<T>> {
        let present = match self.present {
            Some(present) => present,
            None => match self.flag.decode(source).split() {
                Left(done) => *self.present.insert(done.into_inner()),
                Right(state) => return state,
            },
        };
        if !present {
            self.present = None;
            return DecodeState::done(None);
        }
        let state = self.inner.decode(source).map(Some);
        if state.is_done() {
            self.present = None;
        }
        state
    }

    fn reset(&mut self) {
        self.flag.reset();
        self.present = None;
        self.inner.reset();
    }
}

/// See [`DecoderExt::zip`].
#[derive(Debug, Clone)]
pub struct Zip<A, T, B, U> {
    first: A,
    second: B,
    value: Option<T>,
    _phantom: PhantomData<fn() -> U>,
}

impl<A: Decoder<T>, T, B: Decoder<U>, U> Decoder<(T, U)> for Zip<A, T, B, U> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<(T, U)> {
        let first = match self.value.take() {
            Some(first) => first,
            None => match self.first.decode(source).split() {
                Left(done) => done.into_inner(),
                Right(state) => return state,
            },
        };
        match self.second.decode(source).split() {
            Left(done) => DecodeState::done((first, done.into_inner())),
            Right(state) => {
                self.value = Some(first);
                state
            }
        }
    }

    fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String, vec, vec::Vec};
    use core::cell::Cell;

    use super::*;
    use crate::{
        collect::to_vec,
        config::Endianness,
        decode::{constant, fixed, string},
    };

    #[test]
    fn zip_keeps_the_first_value_while_waiting() {
        let mut decoder = fixed::<u8>(Endianness::Big).zip(fixed::<u16>(Endianness::Big));
        assert!(decoder.decode_slice(&[7, 0]).is_processing());
        assert_eq!(decoder.decode_slice(&[9]).into_value(), Some((7, 9)));
    }

    #[test]
    fn and_then_selects_the_next_decoder() {
        let mut decoder = fixed::<u8>(Endianness::Big)
            .and_then(|n| fixed::<u8>(Endianness::Big).repeat(usize::from(n), to_vec()));
        assert!(decoder.decode_slice(&[2, 4]).is_processing());
        assert_eq!(decoder.decode_slice(&[5]).into_value(), Some(vec![4, 5]));
        assert_eq!(decoder.decode_slice(&[0]).into_value(), Some(vec![]));
    }

    #[test]
    fn optional_reads_a_presence_flag() {
        let mut decoder = string(Endianness::Big).optional();
        assert_eq!(decoder.decode_slice(&[0]).into_value(), Some(None));
        let bytes = [1, 0, 0, 0, 2, b'h', b'i'];
        assert_eq!(decoder.decode_slice(&bytes).into_value(), Some(Some(String::from("hi"))));
    }

    #[test]
    fn try_map_can_reject() {
        let mut decoder = fixed::<i8>(Endianness::Big).try_map(|x| {
            u8::try_from(x).map_err(|_| DecodeError::Message("negative".into()))
        });
        assert_eq!(decoder.decode_slice(&[5]).into_value(), Some(5u8));
        assert!(decoder.decode_slice(&[0xff]).is_error());
    }

    #[test]
    fn lazy_map_runs_only_when_read() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut decoder = constant(2).map_lazy(move |x: i32| {
            counter.set(counter.get() + 1);
            x * 10
        });
        assert!(decoder.decode_slice(&[]).is_done());
        assert_eq!(calls.get(), 0);
        assert_eq!(decoder.decode_slice(&[]).into_value(), Some(20));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn boxed_decoders_are_interchangeable() {
        let mut decoders = vec![
            fixed::<u8>(Endianness::Big).map(u32::from).boxed(),
            fixed::<u32>(Endianness::Little).boxed(),
        ];
        let mut source: &[u8] = &[1, 2, 0, 0, 0];
        let values: Vec<_> = decoders
            .iter_mut()
            .map(|d| d.decode(&mut source).into_value())
            .collect();
        assert_eq!(values, [Some(1), Some(2)]);
    }
}
