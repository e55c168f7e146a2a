use core::marker::PhantomData;

use either::Either::{Left, Right};

use super::{DecodeState, Decoder};
use crate::{
    collect::Collector,
    error::{BuildError, DecodeError},
    io::ByteSource,
};

// Elements folded so far. Survives `Processing` so finished elements are never
// decoded twice.
struct Progress<A> {
    acc: Option<A>,
    index: usize,
}

impl<A> Progress<A> {
    fn new() -> Self {
        Self {
            acc: None,
            index: 0,
        }
    }

    fn clear(&mut self) {
        self.acc = None;
        self.index = 0;
    }
}

// Decode elements until `count` have been folded.
fn fill<E, D, C>(
    element: &mut D,
    collector: &C,
    progress: &mut Progress<C::Acc>,
    count: usize,
    source: &mut dyn ByteSource,
) -> DecodeState<C::Output>
where
    D: Decoder<E>,
    C: Collector<E>,
{
    let mut acc = progress.acc.take().unwrap_or_else(|| collector.supply());
    while progress.index < count {
        match element.decode(source).split() {
            Left(done) => {
                collector.accumulate(&mut acc, done.into_inner(), progress.index);
                progress.index += 1;
            }
            Right(state) => {
                progress.acc = Some(acc);
                return state;
            }
        }
    }
    progress.index = 0;
    DecodeState::done(collector.finish(acc))
}

/// Repeat an element decoder a number of times known up front.
pub struct Repeat<D, E, C: Collector<E>> {
    element: D,
    collector: C,
    count: usize,
    progress: Progress<C::Acc>,
    _phantom: PhantomData<fn() -> E>,
}

impl<D: Decoder<E>, E, C: Collector<E>> Repeat<D, E, C> {
    pub fn new(element: D, count: usize, collector: C) -> Self {
        Self {
            element,
            collector,
            count,
            progress: Progress::new(),
            _phantom: PhantomData,
        }
    }

    /// Like [`new`](Self::new), rejecting a negative count.
    pub fn with_arity(element: D, count: i64, collector: C) -> Result<Self, BuildError> {
        let Ok(count) = usize::try_from(count) else {
            Err(BuildError::NegativeArity(count))?
        };
        Ok(Self::new(element, count, collector))
    }
}

impl<D: Decoder<E>, E, C: Collector<E>> Decoder<C::Output> for Repeat<D, E, C> {
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<C::Output> {
        fill(
            &mut self.element,
            &self.collector,
            &mut self.progress,
            self.count,
            source,
        )
    }

    fn reset(&mut self) {
        self.element.reset();
        self.progress.clear();
    }
}

/// Repeat an element decoder as many times as a preceding count says.
///
/// The count is decoded once per collection by a nested, resumable decoder; a
/// negative count is an error.
pub struct PrefixedRepeat<S, N, D, E, C: Collector<E>> {
    size: S,
    count: Option<usize>,
    element: D,
    collector: C,
    progress: Progress<C::Acc>,
    _phantom: PhantomData<fn() -> (N, E)>,
}

impl<S, N, D, E, C> PrefixedRepeat<S, N, D, E, C>
where
    S: Decoder<N>,
    N: Into<i64>,
    D: Decoder<E>,
    C: Collector<E>,
{
    pub fn new(size: S, element: D, collector: C) -> Self {
        Self {
            size,
            count: None,
            element,
            collector,
            progress: Progress::new(),
            _phantom: PhantomData,
        }
    }
}

impl<S, N, D, E, C> Decoder<C::Output> for PrefixedRepeat<S, N, D, E, C>
where
    S: Decoder<N>,
    N: Into<i64>,
    D: Decoder<E>,
    C: Collector<E>,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<C::Output> {
        let count = match self.count {
            Some(count) => count,
            None => {
                let size: i64 = match self.size.decode(source).split() {
                    Left(done) => done.into_inner().into(),
                    Right(state) => return state,
                };
                let Ok(count) = usize::try_from(size) else {
                    tracing::debug!(size, "rejected negative element count");
                    return DecodeState::Error(DecodeError::NegativeSize(size));
                };
                *self.count.insert(count)
            }
        };

        let state = fill(
            &mut self.element,
            &self.collector,
            &mut self.progress,
            count,
            source,
        );
        if state.is_done() {
            self.count = None;
        }
        state
    }

    fn reset(&mut self) {
        self.size.reset();
        self.count = None;
        self.element.reset();
        self.progress.clear();
    }
}

/// Repeat an element decoder until an element satisfies a predicate.
///
/// The terminal element is folded in only if `keep_last` is set.
pub struct UntilRepeat<D, E, C: Collector<E>, P> {
    element: D,
    collector: C,
    predicate: P,
    keep_last: bool,
    progress: Progress<C::Acc>,
    _phantom: PhantomData<fn() -> E>,
}

impl<D, E, C, P> UntilRepeat<D, E, C, P>
where
    D: Decoder<E>,
    C: Collector<E>,
    P: FnMut(&E) -> bool,
{
    pub fn new(element: D, predicate: P, keep_last: bool, collector: C) -> Self {
        Self {
            element,
            collector,
            predicate,
            keep_last,
            progress: Progress::new(),
            _phantom: PhantomData,
        }
    }
}

impl<D, E, C, P> Decoder<C::Output> for UntilRepeat<D, E, C, P>
where
    D: Decoder<E>,
    C: Collector<E>,
    P: FnMut(&E) -> bool,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<C::Output> {
        let progress = &mut self.progress;
        let mut acc = progress
            .acc
            .take()
            .unwrap_or_else(|| self.collector.supply());
        loop {
            let element = match self.element.decode(source).split() {
                Left(done) => done.into_inner(),
                Right(state) => {
                    progress.acc = Some(acc);
                    return state;
                }
            };
            let last = (self.predicate)(&element);
            if !last || self.keep_last {
                self.collector.accumulate(&mut acc, element, progress.index);
                progress.index += 1;
            }
            if last {
                progress.index = 0;
                return DecodeState::done(self.collector.finish(acc));
            }
        }
    }

    fn reset(&mut self) {
        self.element.reset();
        self.progress.clear();
    }
}
