use alloc::{borrow::Cow, boxed::Box, string::String, vec::Vec};
use core::any::Any;

use super::frame::{Frame, Slot};
use crate::{
    collect::{Collector, to_vec},
    config::Config,
    decode::{DecodeState, Decoder, FixedDecoder, Skip, TextDecoder, text},
    error::DecodeError,
    io::ByteSource,
};

/// The result of one step of a composed decoding script.
///
/// Propagate the error with `?`. Any [`DecodeError`] converts into an
/// [`Interrupt`], so failures from helpers propagate the same way.
pub type Step<T> = Result<T, Interrupt>;

/// A signal ending the current run of a composed script.
///
/// Only failures can be created outside this module, through
/// `From<DecodeError>`. The engine turns every interrupt back into a
/// [`DecodeState`] before returning to the caller.
#[derive(Debug)]
pub struct Interrupt(Signal);

#[derive(Debug)]
enum Signal {
    /// The source ran dry inside a step.
    Suspend(Cow<'static, str>),
    /// A step needs a value decoded by a nested run of the script.
    Recurse,
    /// The input is malformed.
    Fail(DecodeError),
}

impl From<DecodeError> for Interrupt {
    fn from(err: DecodeError) -> Self {
        Self(Signal::Fail(err))
    }
}

/// The handle a decoding script reads through.
///
/// Each method is one step. The order of steps must depend only on the values
/// the script has read, never on outside state, since the script is replayed
/// from its first step every time it is resumed.
pub struct DecodingScope<'a, E> {
    frame: &'a mut Frame<E>,
    cursor: usize,
    source: &'a mut dyn ByteSource,
    defaults: &'a mut Defaults,
}

// Progress of a self-collection: the fold so far and how many nested values it
// has received.
struct SelfRepeat<A> {
    acc: Option<A>,
    received: usize,
}

macro_rules! defaults {
    ($($name:ident: $t:ty),* $(,)?) => {
        // Decoders for the primitive steps, shared by every frame. At most one
        // step is in progress at a time.
        struct Defaults {
            $($name: FixedDecoder<$t>,)*
            string: TextDecoder,
        }

        impl Defaults {
            fn new(config: &Config) -> Self {
                Self {
                    $($name: FixedDecoder::new(config.endianness),)*
                    string: text(config),
                }
            }

            fn reset(&mut self) {
                $(self.$name.reset();)*
                self.string.reset();
            }
        }

        impl<E> DecodingScope<'_, E> {
            $(
                #[doc = concat!("Decode a `", stringify!($t), "` in the configured byte order.")]
                pub fn $name(&mut self) -> Step<$t> {
                    self.step(|| (), |_, source, defaults| defaults.$name.decode(source))
                }
            )*
        }
    };
}

defaults! {
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

impl<E> DecodingScope<'_, E> {
    // Run the step at the cursor. A finished step replays its value. An
    // unfinished one is created with `start` on first use and advanced with
    // `drive`.
    fn step<T, P>(
        &mut self,
        start: impl FnOnce() -> P,
        drive: impl FnOnce(&mut P, &mut dyn ByteSource, &mut Defaults) -> DecodeState<T>,
    ) -> Step<T>
    where
        T: Clone + 'static,
        P: 'static,
    {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.frame.slots.len() {
            self.frame.slots.push(Slot::Pending(Box::new(start())));
        }

        // A gap means an earlier step's interrupt was discarded by the script.
        let Some(slot) = self.frame.slots.get_mut(index) else {
            Err(DecodeError::InconsistentScript { step: index })?
        };
        let state = match slot {
            Slot::Ready(value) => return replay(&**value, index),
            Slot::Pending(pending) => {
                let Some(pending) = pending.downcast_mut::<P>() else {
                    Err(DecodeError::InconsistentScript { step: index })?
                };
                drive(pending, &mut *self.source, &mut *self.defaults)
            }
        };

        match state {
            DecodeState::Done(done) => {
                let value = done.into_inner();
                *slot = Slot::Ready(Box::new(value.clone()));
                Ok(value)
            }
            DecodeState::Processing(reason) => Err(Interrupt(Signal::Suspend(reason))),
            DecodeState::Error(err) => Err(err)?,
        }
    }

    /// Decode a string with the configured charset and framing.
    pub fn string(&mut self) -> Step<String> {
        self.step(|| (), |_, source, defaults| defaults.string.decode(source))
    }

    /// Decode with a decoder created by `factory` when this step is first
    /// reached.
    ///
    /// The decoder belongs to the step and is dropped once the step finishes.
    pub fn decode_with<T, D>(&mut self, factory: impl FnOnce() -> D) -> Step<T>
    where
        T: Clone + 'static,
        D: Decoder<T> + 'static,
    {
        self.step(factory, |decoder, source, _| decoder.decode(source))
    }

    /// Discard `count` bytes.
    pub fn skip(&mut self, count: u64) -> Step<()> {
        self.step(|| Skip::new(count), |skip, source, _| skip.decode(source))
    }

    /// Compute a value from earlier results, once.
    ///
    /// Later replays of the script return the stored value without calling
    /// `f` again.
    pub fn once<T: Clone + 'static>(&mut self, f: impl FnOnce() -> T) -> Step<T> {
        self.step(|| (), |_, _, _| DecodeState::done(f()))
    }

    /// Like [`once`](Self::once), with a computation that may reject the
    /// input.
    pub fn try_once<T: Clone + 'static>(
        &mut self,
        f: impl FnOnce() -> Result<T, DecodeError>,
    ) -> Step<T> {
        self.step(|| (), |_, _, _| match f() {
            Ok(value) => DecodeState::done(value),
            Err(err) => DecodeState::Error(err),
        })
    }

    /// Decode a one-byte presence flag, then run `f` if it is set.
    pub fn optional<T>(&mut self, f: impl FnOnce(&mut Self) -> Step<T>) -> Step<Option<T>> {
        if self.boolean()? {
            Ok(Some(f(self)?))
        } else {
            Ok(None)
        }
    }

    /// Like [`optional`](Self::optional), with the presence flag read by a
    /// decoder created by `flag`.
    pub fn optional_with<T, D>(
        &mut self,
        flag: impl FnOnce() -> D,
        f: impl FnOnce(&mut Self) -> Step<T>,
    ) -> Step<Option<T>>
    where
        D: Decoder<bool> + 'static,
    {
        if self.decode_with(flag)? {
            Ok(Some(f(self)?))
        } else {
            Ok(None)
        }
    }

    /// Fail with a custom message.
    pub fn fail<T>(&mut self, reason: impl Into<Cow<'static, str>>) -> Step<T> {
        Err(DecodeError::Message(reason.into()).into())
    }
}

impl<E: Clone + 'static> DecodingScope<'_, E> {
    /// Decode another value of the type being decoded, using the same script.
    ///
    /// The nested value is decoded in its own frame on the engine's heap
    /// stack; the current run stops here and resumes once it is available.
    pub fn recurse(&mut self) -> Step<E> {
        let index = self.cursor;
        self.cursor += 1;
        if let Some(slot) = self.frame.slots.get(index) {
            return match slot {
                Slot::Ready(value) => replay(&**value, index),
                Slot::Pending(_) => Err(DecodeError::InconsistentScript { step: index })?,
            };
        }
        if index > self.frame.slots.len() {
            Err(DecodeError::InconsistentScript { step: index })?
        }

        match self.frame.child.take() {
            Some(value) => {
                self.frame.slots.push(Slot::Ready(Box::new(value.clone())));
                Ok(value)
            }
            None => Err(Interrupt(Signal::Recurse)),
        }
    }

    /// Decode a presence flag, then a nested value if it is set.
    pub fn self_or_none(&mut self) -> Step<Option<E>> {
        self.optional(Self::recurse)
    }

    /// Decode a presence flag with a decoder created by `flag`, then a nested
    /// value if it is set.
    pub fn self_or_none_with<D>(&mut self, flag: impl FnOnce() -> D) -> Step<Option<E>>
    where
        D: Decoder<bool> + 'static,
    {
        self.optional_with(flag, Self::recurse)
    }

    /// Decode a four-byte signed count, then that many nested values folded
    /// with `collector`.
    pub fn self_collection<C>(&mut self, collector: &C) -> Step<C::Output>
    where
        C: Collector<E>,
        C::Acc: 'static,
        C::Output: Clone + 'static,
    {
        let size = self.i32()?;
        self.nested_values(collector, size.into())
    }

    /// Decode a count with a decoder created by `size`, then that many nested
    /// values folded with `collector`.
    pub fn self_collection_with<C, S, N>(&mut self, collector: &C, size: impl FnOnce() -> S) -> Step<C::Output>
    where
        C: Collector<E>,
        C::Acc: 'static,
        C::Output: Clone + 'static,
        S: Decoder<N> + 'static,
        N: Into<i64> + Clone + 'static,
    {
        let size = self.decode_with(size)?;
        self.nested_values(collector, size.into())
    }

    fn nested_values<C>(&mut self, collector: &C, size: i64) -> Step<C::Output>
    where
        C: Collector<E>,
        C::Acc: 'static,
        C::Output: Clone + 'static,
    {
        let count = match usize::try_from(size) {
            Ok(count) => count,
            Err(_) if size < 0 => {
                tracing::debug!(size, "rejected negative element count");
                Err(DecodeError::NegativeSize(size))?
            }
            Err(_) => Err(DecodeError::SizeOverflow(size))?,
        };

        let index = self.cursor;
        self.cursor += 1;
        if index == self.frame.slots.len() {
            let progress = SelfRepeat {
                acc: Some(collector.supply()),
                received: 0,
            };
            self.frame.slots.push(Slot::Pending(Box::new(progress)));
        }

        let frame = &mut *self.frame;
        let Some(slot) = frame.slots.get_mut(index) else {
            Err(DecodeError::InconsistentScript { step: index })?
        };
        let output = match slot {
            Slot::Ready(value) => return replay(&**value, index),
            Slot::Pending(pending) => {
                let Some(progress) = pending.downcast_mut::<SelfRepeat<C::Acc>>() else {
                    Err(DecodeError::InconsistentScript { step: index })?
                };
                let Some(acc) = progress.acc.as_mut() else {
                    Err(DecodeError::InconsistentScript { step: index })?
                };
                if let Some(child) = frame.child.take() {
                    collector.accumulate(acc, child, progress.received);
                    progress.received += 1;
                }
                if progress.received < count {
                    return Err(Interrupt(Signal::Recurse));
                }
                match progress.acc.take() {
                    Some(acc) => collector.finish(acc),
                    None => Err(DecodeError::InconsistentScript { step: index })?,
                }
            }
        };

        *slot = Slot::Ready(Box::new(output.clone()));
        Ok(output)
    }

    /// Decode a four-byte signed count, then that many nested values.
    pub fn self_vec(&mut self) -> Step<Vec<E>> {
        self.self_collection(&to_vec())
    }

    /// Decode a presence flag, then a self-collection if it is set.
    pub fn self_collection_or_none<C>(&mut self, collector: &C) -> Step<Option<C::Output>>
    where
        C: Collector<E>,
        C::Acc: 'static,
        C::Output: Clone + 'static,
    {
        self.optional(|scope| scope.self_collection(collector))
    }

    /// Decode a presence flag with `flag`, then a self-collection whose count
    /// is read with `size` if it is set.
    pub fn self_collection_or_none_with<C, D, S, N>(
        &mut self,
        collector: &C,
        flag: impl FnOnce() -> D,
        size: impl FnOnce() -> S,
    ) -> Step<Option<C::Output>>
    where
        C: Collector<E>,
        C::Acc: 'static,
        C::Output: Clone + 'static,
        D: Decoder<bool> + 'static,
        S: Decoder<N> + 'static,
        N: Into<i64> + Clone + 'static,
    {
        self.optional_with(flag, |scope| scope.self_collection_with(collector, size))
    }
}

fn replay<T: Clone + 'static>(value: &dyn Any, index: usize) -> Step<T> {
    match value.downcast_ref::<T>() {
        Some(value) => Ok(value.clone()),
        None => Err(DecodeError::InconsistentScript { step: index })?,
    }
}

/// A decoder running a script written against a [`DecodingScope`].
///
/// The script is called repeatedly: once per frame each time the decoder is
/// resumed, and once more for every nested value it asks for. Values from
/// finished steps are replayed by cloning, so recursive links must be held in
/// an `Rc` or `Arc`: with owned links every level would copy its whole subtree.
pub struct ComposedDecoder<E, F> {
    script: F,
    root: Frame<E>,
    nested: Vec<Frame<E>>,
    defaults: Defaults,
}

/// Create a composed decoder with the default [`Config`].
pub fn compose<E, F>(script: F) -> ComposedDecoder<E, F>
where
    E: Clone + 'static,
    F: FnMut(&mut DecodingScope<'_, E>) -> Step<E>,
{
    ComposedDecoder::new(script)
}

impl<E, F> ComposedDecoder<E, F>
where
    E: Clone + 'static,
    F: FnMut(&mut DecodingScope<'_, E>) -> Step<E>,
{
    pub fn new(script: F) -> Self {
        Self::with_config(Config::new(), script)
    }

    /// Create a composed decoder whose primitive steps follow `config`.
    pub fn with_config(config: Config, script: F) -> Self {
        Self {
            script,
            root: Frame::new(),
            nested: Vec::new(),
            defaults: Defaults::new(&config),
        }
    }

    /// Number of nested values currently being decoded.
    pub fn depth(&self) -> usize {
        self.nested.len()
    }
}

impl<E, F> Decoder<E> for ComposedDecoder<E, F>
where
    E: Clone + 'static,
    F: FnMut(&mut DecodingScope<'_, E>) -> Step<E>,
{
    fn decode(&mut self, source: &mut dyn ByteSource) -> DecodeState<E> {
        loop {
            let frame = self.nested.last_mut().unwrap_or(&mut self.root);
            let mut scope = DecodingScope {
                frame,
                cursor: 0,
                source: &mut *source,
                defaults: &mut self.defaults,
            };

            match (self.script)(&mut scope) {
                Ok(value) => {
                    if self.nested.pop().is_none() {
                        self.root.clear();
                        return DecodeState::done(value);
                    }
                    let depth = self.nested.len();
                    let parent = self.nested.last_mut().unwrap_or(&mut self.root);
                    parent.child = Some(value);
                    tracing::trace!(depth, "left nested frame");
                }
                Err(Interrupt(Signal::Recurse)) => {
                    self.nested.push(Frame::new());
                    tracing::trace!(depth = self.nested.len(), "entered nested frame");
                }
                Err(Interrupt(Signal::Suspend(reason))) => return DecodeState::Processing(reason),
                Err(Interrupt(Signal::Fail(err))) => {
                    tracing::debug!(depth = self.nested.len(), %err, "composed decode failed");
                    return DecodeState::Error(err);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.root.clear();
        self.nested.clear();
        self.defaults.reset();
    }
}
