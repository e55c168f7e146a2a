use alloc::{collections::VecDeque, vec::Vec};
use core::{marker::PhantomData, mem};

use crate::{
    config::{Config, Endianness},
    encode::{Encoder, FixedEncoder, TextEncoder, text},
    error::EncodeError,
    io::ByteSink,
};

/// Work left over from one run of an encoding script.
enum Op<'v, T> {
    /// Encode a nested value with the same script.
    Nested(&'v T),
    /// Write bytes the script produced after a nested value.
    Recorded(Recording),
}

#[derive(Debug)]
enum Write {
    Bit(bool),
    Bytes(Vec<u8>),
    Flush,
}

// Sink capturing writes for later replay, bit for bit.
#[derive(Debug, Default)]
struct Recording {
    writes: Vec<Write>,
}

impl Recording {
    fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn replay(self, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        for write in self.writes {
            match write {
                Write::Bit(bit) => sink.write_bit(bit)?,
                Write::Bytes(bytes) => sink.write_bytes(&bytes)?,
                Write::Flush => sink.flush()?,
            }
        }
        Ok(())
    }
}

impl ByteSink for Recording {
    fn write_bit(&mut self, bit: bool) -> Result<(), EncodeError> {
        self.writes.push(Write::Bit(bit));
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError> {
        self.write_bytes(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        match self.writes.last_mut() {
            Some(Write::Bytes(run)) => run.extend_from_slice(bytes),
            _ => self.writes.push(Write::Bytes(bytes.to_vec())),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EncodeError> {
        self.writes.push(Write::Flush);
        Ok(())
    }
}

/// The handle an encoding script writes through.
///
/// Writes reach the sink directly until the script first asks for a nested
/// value. From then on they are recorded and replayed after the nested value
/// has been written, which reproduces the byte order of an eager recursive
/// encoder.
pub struct EncodingScope<'s, 'v, T> {
    sink: &'s mut dyn ByteSink,
    order: Endianness,
    text: &'s TextEncoder,
    queue: VecDeque<Op<'v, T>>,
    tail: Recording,
    deferred: bool,
}

macro_rules! primitives {
    ($($name:ident: $t:ty),* $(,)?) => {
        impl<T> EncodingScope<'_, '_, T> {
            $(
                #[doc = concat!("Write a `", stringify!($t), "` in the configured byte order.")]
                pub fn $name(&mut self, value: $t) -> Result<(), EncodeError> {
                    let encoder = FixedEncoder::<$t>::new(self.order);
                    encoder.encode(&value, self.sink())
                }
            )*
        }
    };
}

primitives! {
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

impl<'v, T> EncodingScope<'_, 'v, T> {
    fn sink(&mut self) -> &mut dyn ByteSink {
        if self.deferred {
            &mut self.tail
        } else {
            &mut *self.sink
        }
    }

    /// Write a string with the configured charset and framing.
    pub fn string(&mut self, value: &str) -> Result<(), EncodeError> {
        let text = self.text;
        text.encode(value, self.sink())
    }

    /// Write a value with an arbitrary encoder.
    pub fn write<V: ?Sized>(&mut self, value: &V, encoder: &impl Encoder<V>) -> Result<(), EncodeError> {
        encoder.encode(value, self.sink())
    }

    pub fn bit(&mut self, bit: bool) -> Result<(), EncodeError> {
        self.sink().write_bit(bit)
    }

    /// Write `bits` zero bits.
    pub fn pad(&mut self, bits: usize) -> Result<(), EncodeError> {
        let sink = self.sink();
        (0..bits).try_for_each(|_| sink.write_bit(false))
    }

    /// Pad a partial byte with zero bits.
    pub fn align(&mut self) -> Result<(), EncodeError> {
        self.sink().flush()
    }

    /// Encode another value of the type being encoded, using the same script.
    ///
    /// The value is queued rather than encoded in place; everything the script
    /// writes afterwards is held back until it is done.
    pub fn encode_self(&mut self, value: &'v T) -> Result<(), EncodeError> {
        let tail = mem::take(&mut self.tail);
        if !tail.is_empty() {
            self.queue.push_back(Op::Recorded(tail));
        }
        self.queue.push_back(Op::Nested(value));
        self.deferred = true;
        Ok(())
    }

    /// Write a presence flag, then the nested value if present.
    pub fn self_or_none(&mut self, value: Option<&'v T>) -> Result<(), EncodeError> {
        self.boolean(value.is_some())?;
        match value {
            Some(value) => self.encode_self(value),
            None => Ok(()),
        }
    }

    /// Write a presence flag with `flag`, then the nested value if present.
    pub fn self_or_none_with(&mut self, value: Option<&'v T>, flag: &impl Encoder<bool>) -> Result<(), EncodeError> {
        self.write(&value.is_some(), flag)?;
        match value {
            Some(value) => self.encode_self(value),
            None => Ok(()),
        }
    }

    /// Write a four-byte signed count, then every nested value.
    pub fn self_collection<I>(&mut self, values: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = &'v T>,
        I::IntoIter: ExactSizeIterator,
    {
        let size = FixedEncoder::<i32>::new(self.order);
        self.self_collection_with(values, &size)
    }

    /// Write a count with `size`, then every nested value.
    ///
    /// A count the size type cannot hold fails before any element is written.
    pub fn self_collection_with<I, S, N>(&mut self, values: I, size: &S) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = &'v T>,
        I::IntoIter: ExactSizeIterator,
        S: Encoder<N>,
        N: TryFrom<usize>,
    {
        let mut values = values.into_iter();
        let len = values.len();
        let count = N::try_from(len).map_err(|_| EncodeError::SizeOverflow { len })?;
        self.write(&count, size)?;
        values.try_for_each(|value| self.encode_self(value))
    }
}

/// An encoder running a script written against an [`EncodingScope`].
///
/// Nested values are encoded from a heap-allocated stack of queues, so the
/// native stack does not grow with the depth of the value. The encoder holds
/// no state between calls.
pub struct ComposedEncoder<T, F> {
    script: F,
    order: Endianness,
    text: TextEncoder,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F> ComposedEncoder<T, F>
where
    F: for<'s, 'v> Fn(&'v T, &mut EncodingScope<'s, 'v, T>) -> Result<(), EncodeError>,
{
    pub fn new(script: F) -> Self {
        Self::with_config(Config::new(), script)
    }

    /// Create a composed encoder whose primitive writes follow `config`.
    pub fn with_config(config: Config, script: F) -> Self {
        Self {
            script,
            order: config.endianness,
            text: text(&config),
            _phantom: PhantomData,
        }
    }

    // Run the script once, returning the work it deferred.
    fn run<'v>(&self, value: &'v T, sink: &mut dyn ByteSink) -> Result<VecDeque<Op<'v, T>>, EncodeError> {
        let mut scope = EncodingScope {
            sink,
            order: self.order,
            text: &self.text,
            queue: VecDeque::new(),
            tail: Recording::default(),
            deferred: false,
        };
        (self.script)(value, &mut scope)?;

        let EncodingScope { mut queue, tail, .. } = scope;
        if !tail.is_empty() {
            queue.push_back(Op::Recorded(tail));
        }
        Ok(queue)
    }
}

impl<T, F> Encoder<T> for ComposedEncoder<T, F>
where
    F: for<'s, 'v> Fn(&'v T, &mut EncodingScope<'s, 'v, T>) -> Result<(), EncodeError>,
{
    fn encode(&self, value: &T, sink: &mut dyn ByteSink) -> Result<(), EncodeError> {
        let mut pending = Vec::new();
        let queue = self.run(value, sink)?;
        if !queue.is_empty() {
            pending.push(queue);
        }

        while let Some(queue) = pending.last_mut() {
            let Some(op) = queue.pop_front() else {
                pending.pop();
                continue;
            };
            // Drop an exhausted queue before descending, so a chain of single
            // links keeps the stack at one queue.
            if queue.is_empty() {
                pending.pop();
            }

            match op {
                Op::Recorded(recording) => recording.replay(sink)?,
                Op::Nested(value) => {
                    let queue = self.run(value, sink)?;
                    if !queue.is_empty() {
                        pending.push(queue);
                        tracing::trace!(depth = pending.len(), "deferred nested encoding");
                    }
                }
            }
        }
        Ok(())
    }
}
