//! Error types for the flowstate runtime.
//!
//! Three conditions are distinguished for callers: coder failures, missing
//! optional capabilities, and side inputs that are not ready yet. Backend
//! failures and I/O errors are carried alongside them. A scalar lookup that
//! finds nothing, or an empty tag list, is never an error.

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = FlowstateError> = std::result::Result<T, E>;

/// The main error type for flowstate operations.
#[derive(Debug, Error)]
pub enum FlowstateError {
    /// A value could not be encoded or decoded by its coder.
    #[error("{0}")]
    Coder(#[from] CoderError),

    /// An optional capability is not provided by this execution context.
    #[error("{0}")]
    Unsupported(#[from] UnsupportedCapabilityError),

    /// The requested side input is not present for the requested window.
    #[error("{0}")]
    SideInputNotReady(#[from] SideInputNotReadyError),

    /// The keyed state backend failed.
    #[error("{0}")]
    Backend(#[from] StateBackendError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowstateError {
    /// Returns true for the recoverable "side input not ready" condition.
    ///
    /// Callers should defer the work rather than fail it.
    #[must_use]
    pub fn is_side_input_not_ready(&self) -> bool {
        matches!(self, Self::SideInputNotReady(_))
    }

    /// Returns true if an optional capability was missing.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Returns true if a coder failed to encode or decode a value.
    #[must_use]
    pub fn is_coder_error(&self) -> bool {
        matches!(self, Self::Coder(_))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::Coder(err) => err.to_dict(),
            Self::Unsupported(err) => {
                let mut map = HashMap::new();
                map.insert("type".to_string(), json!("UnsupportedCapability"));
                map.insert("capability".to_string(), json!(err.capability));
                map
            }
            Self::SideInputNotReady(err) => {
                let mut map = HashMap::new();
                map.insert("type".to_string(), json!("SideInputNotReady"));
                map.insert("view".to_string(), json!(err.view));
                map.insert("window".to_string(), json!(err.window));
                map
            }
            Self::Backend(err) => {
                let mut map = HashMap::new();
                map.insert("type".to_string(), json!("StateBackend"));
                map.insert("operation".to_string(), json!(err.operation));
                map
            }
            Self::Io(_) => {
                let mut map = HashMap::new();
                map.insert("type".to_string(), json!("Io"));
                map
            }
        };
        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}

/// Errors raised by coders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoderError {
    /// The value could not be encoded.
    #[error("Encode failed in {coder}: {message}")]
    Encode {
        /// The coder name.
        coder: String,
        /// What went wrong.
        message: String,
    },

    /// The bytes could not be decoded.
    #[error("Decode failed in {coder}: {message}")]
    Decode {
        /// The coder name.
        coder: String,
        /// What went wrong.
        message: String,
    },
}

impl CoderError {
    /// Creates an encode error.
    #[must_use]
    pub fn encode(coder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            coder: coder.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(coder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            coder: coder.into(),
            message: message.into(),
        }
    }

    /// Returns the name of the coder that failed.
    #[must_use]
    pub fn coder(&self) -> &str {
        match self {
            Self::Encode { coder, .. } | Self::Decode { coder, .. } => coder,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        match self {
            Self::Encode { coder, message } => {
                map.insert("type".to_string(), json!("Encode"));
                map.insert("coder".to_string(), json!(coder));
                map.insert("reason".to_string(), json!(message));
            }
            Self::Decode { coder, message } => {
                map.insert("type".to_string(), json!("Decode"));
                map.insert("coder".to_string(), json!(coder));
                map.insert("reason".to_string(), json!(message));
            }
        }
        map
    }
}

/// Error raised when an optional capability is invoked on a context
/// that was built without it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported capability: {capability}")]
pub struct UnsupportedCapabilityError {
    /// The capability that was requested.
    pub capability: String,
}

impl UnsupportedCapabilityError {
    /// Creates a new unsupported capability error.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

/// Error raised when a side input has not been materialized for a window.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Side input '{view}' is not ready for window {window}")]
pub struct SideInputNotReadyError {
    /// The side input view id.
    pub view: String,
    /// The side input window the lookup was mapped to.
    pub window: String,
}

impl SideInputNotReadyError {
    /// Creates a new side input not ready error.
    #[must_use]
    pub fn new(view: impl Into<String>, window: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            window: window.into(),
        }
    }
}

/// Error raised by a keyed state backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("State backend error during {operation}: {message}")]
pub struct StateBackendError {
    /// The backend operation that failed.
    pub operation: String,
    /// Additional message.
    pub message: String,
}

impl StateBackendError {
    /// Creates a new backend error.
    #[must_use]
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coder_error_display() {
        let err = CoderError::decode("Utf8Coder", "invalid utf-8 sequence");
        assert_eq!(
            err.to_string(),
            "Decode failed in Utf8Coder: invalid utf-8 sequence"
        );
        assert_eq!(err.coder(), "Utf8Coder");
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let coder: FlowstateError = CoderError::encode("JsonCoder", "boom").into();
        let unsupported: FlowstateError = UnsupportedCapabilityError::new("view_data").into();
        let not_ready: FlowstateError = SideInputNotReadyError::new("v", "global").into();

        assert!(coder.is_coder_error());
        assert!(!coder.is_unsupported());
        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_side_input_not_ready());
        assert!(not_ready.is_side_input_not_ready());
        assert!(!not_ready.is_coder_error());
    }

    #[test]
    fn test_to_dict() {
        let err: FlowstateError = SideInputNotReadyError::new("prices", "global").into();
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "SideInputNotReady");
        assert_eq!(dict.get("view").unwrap(), "prices");
        assert!(dict
            .get("message")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("not ready"));
    }

    #[test]
    fn test_backend_error_message() {
        let err = StateBackendError::new("put_value", "disk full");
        assert!(err.to_string().contains("put_value"));
        assert!(err.to_string().contains("disk full"));
    }
}
