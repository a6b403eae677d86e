//! Coders shipped with the runtime.

use super::Coder;
use crate::core::{Window, WindowedValue};
use crate::errors::CoderError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Encodes any serde type as JSON.
pub struct JsonCoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCoder<T> {
    /// Creates a new JSON coder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCoder")
    }
}

impl<T> Coder<T> for JsonCoder<T>
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        "JsonCoder"
    }

    fn encode(&self, value: &T) -> Result<Vec<u8>, CoderError> {
        serde_json::to_vec(value).map_err(|e| CoderError::encode(self.name(), e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CoderError> {
        serde_json::from_slice(bytes).map_err(|e| CoderError::decode(self.name(), e.to_string()))
    }
}

/// Coder for window identities.
pub type WindowCoder = JsonCoder<Window>;

/// Coder for a window's worth of emitted elements.
pub type WindowedValuesCoder = JsonCoder<Vec<WindowedValue>>;

/// Encodes strings as raw UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Coder;

impl Coder<String> for Utf8Coder {
    fn name(&self) -> &str {
        "Utf8Coder"
    }

    fn encode(&self, value: &String) -> Result<Vec<u8>, CoderError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CoderError> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CoderError::decode(self.name(), e.to_string()))
    }
}

/// Encodes `i64` as eight big-endian bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigEndianI64Coder;

impl Coder<i64> for BigEndianI64Coder {
    fn name(&self) -> &str {
        "BigEndianI64Coder"
    }

    fn encode(&self, value: &i64) -> Result<Vec<u8>, CoderError> {
        Ok(value.to_be_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64, CoderError> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            CoderError::decode(
                self.name(),
                format!("expected 8 bytes, found {}", bytes.len()),
            )
        })?;
        Ok(i64::from_be_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_millis;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        celsius: f64,
    }

    #[test]
    fn test_json_coder_round_trip() {
        let coder = JsonCoder::<Reading>::new();
        let reading = Reading {
            sensor: "t-1".to_string(),
            celsius: 21.5,
        };

        let bytes = coder.encode(&reading).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), reading);
    }

    #[test]
    fn test_json_coder_decode_failure() {
        let coder = JsonCoder::<Reading>::new();
        let err = coder.decode(b"{not json").unwrap_err();
        assert!(matches!(err, CoderError::Decode { .. }));
        assert_eq!(err.coder(), "JsonCoder");
    }

    #[test]
    fn test_utf8_coder_rejects_invalid_bytes() {
        let coder = Utf8Coder;
        assert_eq!(coder.encode(&"héllo".to_string()).unwrap(), "héllo".as_bytes());
        assert!(coder.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_i64_coder_requires_eight_bytes() {
        let coder = BigEndianI64Coder;
        assert_eq!(coder.encode(&1).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(coder.decode(&(-42_i64).to_be_bytes()).unwrap(), -42);

        let err = coder.decode(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("expected 8 bytes, found 3"));
    }

    #[test]
    fn test_window_coder() {
        let coder = WindowCoder::new();
        let window = Window::interval(from_millis(0).unwrap(), from_millis(10).unwrap());
        let bytes = coder.encode(&window).unwrap();
        assert_eq!(coder.decode(&bytes).unwrap(), window);
    }
}
