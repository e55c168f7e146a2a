//! Folding decoded elements into containers.
//!
//! A [`Collector`] is the classic supply/accumulate/finish triple. Repetition
//! decoders and the composition engine's self-collections are generic over it,
//! so the same strategy can build a `Vec`, a `BTreeMap`, a running sum, or
//! anything else.

use alloc::vec::Vec;
use core::{iter, marker::PhantomData};

/// A fold from elements of type `E` to a result.
pub trait Collector<E> {
    /// Intermediate state.
    type Acc;
    /// Final result.
    type Output;

    /// Create an empty accumulator.
    fn supply(&self) -> Self::Acc;

    /// Add the `index`-th element.
    fn accumulate(&self, acc: &mut Self::Acc, element: E, index: usize);

    /// Convert the accumulator into the result.
    fn finish(&self, acc: Self::Acc) -> Self::Output;
}

impl<E, C: Collector<E> + ?Sized> Collector<E> for &C {
    type Acc = C::Acc;
    type Output = C::Output;

    fn supply(&self) -> Self::Acc {
        (**self).supply()
    }

    fn accumulate(&self, acc: &mut Self::Acc, element: E, index: usize) {
        (**self).accumulate(acc, element, index);
    }

    fn finish(&self, acc: Self::Acc) -> Self::Output {
        (**self).finish(acc)
    }
}

/// Collector into any `Default + Extend` container.
#[derive(Debug)]
pub struct Extending<C>(PhantomData<fn() -> C>);

impl<C> Clone for Extending<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Extending<C> {}

impl<C> Default for Extending<C> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

/// Collect into a container such as `Vec`, `String`, `BTreeSet` or `BTreeMap`.
pub fn into<C>() -> Extending<C> {
    Extending::default()
}

/// Collect into a `Vec`.
pub fn to_vec<E>() -> Extending<Vec<E>> {
    Extending::default()
}

impl<E, C: Default + Extend<E>> Collector<E> for Extending<C> {
    type Acc = C;
    type Output = C;

    fn supply(&self) -> C {
        C::default()
    }

    fn accumulate(&self, acc: &mut C, element: E, _index: usize) {
        acc.extend(iter::once(element));
    }

    fn finish(&self, acc: C) -> C {
        acc
    }
}

/// Collector assembled from three closures.
///
/// Created with [`from_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnCollector<S, A, F> {
    supply: S,
    accumulate: A,
    finish: F,
}

/// Build a collector from a supplier, an accumulator and a finisher.
pub fn from_fn<E, Acc, R, S, A, F>(supply: S, accumulate: A, finish: F) -> FnCollector<S, A, F>
where
    S: Fn() -> Acc,
    A: Fn(&mut Acc, E, usize),
    F: Fn(Acc) -> R,
{
    FnCollector {
        supply,
        accumulate,
        finish,
    }
}

impl<E, Acc, R, S, A, F> Collector<E> for FnCollector<S, A, F>
where
    S: Fn() -> Acc,
    A: Fn(&mut Acc, E, usize),
    F: Fn(Acc) -> R,
{
    type Acc = Acc;
    type Output = R;

    fn supply(&self) -> Acc {
        (self.supply)()
    }

    fn accumulate(&self, acc: &mut Acc, element: E, index: usize) {
        (self.accumulate)(acc, element, index);
    }

    fn finish(&self, acc: Acc) -> R {
        (self.finish)(acc)
    }
}

/// Collector counting elements and discarding them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counting;

impl<E> Collector<E> for Counting {
    type Acc = usize;
    type Output = usize;

    fn supply(&self) -> usize {
        0
    }

    fn accumulate(&self, acc: &mut usize, _element: E, _index: usize) {
        *acc += 1;
    }

    fn finish(&self, acc: usize) -> usize {
        acc
    }
}
