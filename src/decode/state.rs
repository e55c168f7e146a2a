use alloc::{borrow::Cow, boxed::Box};
use core::{
    cell::{Cell, OnceCell},
    fmt,
};

use either::Either::{self, Left, Right};

use crate::error::DecodeError;

/// The outcome of a call to [`Decoder::decode`](super::Decoder::decode).
#[derive(Debug)]
pub enum DecodeState<T> {
    /// A value was decoded. The decoder is ready for the next value.
    Done(Done<T>),
    /// More bytes are required. The reason is diagnostic only.
    Processing(Cow<'static, str>),
    /// The input is malformed or the source failed. The decoder must be reset.
    Error(DecodeError),
}

impl<T> DecodeState<T> {
    pub fn done(value: T) -> Self {
        Self::Done(Done::ready(value))
    }

    pub fn processing(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Processing(reason.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The decoded value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Done(done) => Some(done.into_inner()),
            _ => None,
        }
    }

    /// The decoded value, `None` while processing, or the error.
    pub fn into_result(self) -> Result<Option<T>, DecodeError> {
        match self {
            Self::Done(done) => Ok(Some(done.into_inner())),
            Self::Processing(_) => Ok(None),
            Self::Error(err) => Err(err),
        }
    }

    /// Transform a decoded value now. [`Done::map`] defers the work instead.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DecodeState<U> {
        self.and_then(|value| Ok(f(value)))
    }

    /// Transform a decoded value with a conversion that may reject it.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, DecodeError>) -> DecodeState<U> {
        match self.split() {
            Left(done) => match f(done.into_inner()) {
                Ok(value) => DecodeState::done(value),
                Err(err) => DecodeState::Error(err),
            },
            Right(state) => state,
        }
    }

    /// Separate a finished value from an unfinished state, retyping the
    /// latter so it can be returned from a decoder producing `U`.
    pub fn split<U>(self) -> Either<Done<T>, DecodeState<U>> {
        match self {
            Self::Done(done) => Left(done),
            Self::Processing(reason) => Right(DecodeState::Processing(reason)),
            Self::Error(err) => Right(DecodeState::Error(err)),
        }
    }
}

/// A decoded value, computed at most once on first access.
pub struct Done<T> {
    cell: OnceCell<T>,
    init: Cell<Option<Box<dyn FnOnce() -> T>>>,
}

impl<T> Done<T> {
    /// Wrap an already computed value.
    pub fn ready(value: T) -> Self {
        Self {
            cell: OnceCell::from(value),
            init: Cell::new(None),
        }
    }

    /// Defer computing the value until it is first accessed.
    pub fn lazy(f: impl FnOnce() -> T + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            init: Cell::new(Some(Box::new(f))),
        }
    }

    /// Whether the value has been computed yet.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> &T {
        self.cell.get_or_init(|| match self.init.take() {
            Some(f) => f(),
            None => unreachable!("unresolved value without initializer"),
        })
    }

    pub fn into_inner(self) -> T {
        let Self { cell, init } = self;
        match cell.into_inner() {
            Some(value) => value,
            None => match init.into_inner() {
                Some(f) => f(),
                None => unreachable!("unresolved value without initializer"),
            },
        }
    }

    /// Transform the value, deferring the work until it is accessed.
    pub fn map<U>(self, f: impl FnOnce(T) -> U + 'static) -> Done<U>
    where
        T: 'static,
    {
        Done::lazy(move || f(self.into_inner()))
    }
}

impl<T: fmt::Debug> fmt::Debug for Done<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Done").field(value).finish(),
            None => f.write_str("Done(<lazy>)"),
        }
    }
}
