//! Byte sources feeding decoders and bit-granular sinks fed by encoders.
//!
//! Sources are pull-based and best-effort: when no byte is available right
//! now, they say so instead of blocking, and the decoder reading them answers
//! [`Processing`](crate::decode::DecodeState::Processing). Sinks buffer a
//! partial byte between bit writes and only hand whole bytes to their
//! underlying [`ByteOutput`].

mod sink;
mod source;

pub use sink::{BitWriter, ByteOutput, ByteSink, Discard, FnOutput};
#[cfg(feature = "std")]
pub use sink::StreamOutput;
pub use source::{BitReader, ByteSource, FnSource, from_fn};
#[cfg(feature = "std")]
pub use source::StreamSource;
