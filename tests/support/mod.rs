#![allow(dead_code)]

use cassette::{ByteSource, DecodeError, DecodeState, Decoder};

/// A source that alternates between having nothing and having one byte.
pub struct Trickle<'a> {
    bytes: &'a [u8],
    starved: bool,
}

impl<'a> Trickle<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            starved: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl ByteSource for Trickle<'_> {
    fn read(&mut self) -> Result<Option<u8>, DecodeError> {
        self.starved = !self.starved;
        if self.starved {
            return Ok(None);
        }
        let Some((&first, rest)) = self.bytes.split_first() else {
            return Ok(None);
        };
        self.bytes = rest;
        Ok(Some(first))
    }
}

/// Feed `bytes` through a [`Trickle`] until the decoder finishes, returning the
/// value and the number of calls it took.
pub fn trickle<T>(decoder: &mut impl Decoder<T>, bytes: &[u8]) -> (T, usize) {
    let mut source = Trickle::new(bytes);
    let limit = 2 * bytes.len() + 2;
    for calls in 1..=limit {
        match decoder.decode(&mut source) {
            DecodeState::Done(done) => {
                assert_eq!(source.remaining(), 0, "decoder finished early");
                return (done.into_inner(), calls);
            }
            DecodeState::Processing(_) => {}
            DecodeState::Error(err) => panic!("decode failed after {calls} calls: {err}"),
        }
    }
    panic!("decoder did not finish within {limit} calls");
}
