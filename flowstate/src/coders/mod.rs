//! Byte-exact value coders.
//!
//! Every tagged state cell, tag list and side input is persisted as bytes
//! produced by a [`Coder`]. Coders must round-trip every value they are
//! used with; a failure in either direction surfaces as a [`CoderError`].
//!
//! [`CoderError`]: crate::errors::CoderError

mod standard;

pub use standard::{
    BigEndianI64Coder, JsonCoder, Utf8Coder, WindowCoder, WindowedValuesCoder,
};

use crate::errors::CoderError;

/// Encodes values of `T` to bytes and back.
pub trait Coder<T>: Send + Sync {
    /// A short, stable name used in diagnostics.
    fn name(&self) -> &str;

    /// Encodes a value.
    fn encode(&self, value: &T) -> Result<Vec<u8>, CoderError>;

    /// Decodes a value.
    fn decode(&self, bytes: &[u8]) -> Result<T, CoderError>;
}
