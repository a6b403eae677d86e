//! Emitted elements and output tags.

use super::Window;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// An element emitted by a step, with its event timestamp and windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedValue {
    /// The element payload.
    pub value: serde_json::Value,
    /// The event timestamp.
    pub timestamp: Timestamp,
    /// The windows the element belongs to.
    #[serde(default)]
    pub windows: Vec<Window>,
}

impl WindowedValue {
    /// Creates a value in the given windows.
    #[must_use]
    pub fn new(value: serde_json::Value, timestamp: Timestamp, windows: Vec<Window>) -> Self {
        Self {
            value,
            timestamp,
            windows,
        }
    }

    /// Creates a value in the global window.
    #[must_use]
    pub fn in_global_window(value: serde_json::Value, timestamp: Timestamp) -> Self {
        Self::new(value, timestamp, vec![Window::Global])
    }
}

/// Names a side output of a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputTag(Arc<str>);

impl OutputTag {
    /// Creates a new output tag.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutputTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OutputTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_millis;

    #[test]
    fn test_in_global_window() {
        let value = WindowedValue::in_global_window(serde_json::json!(7), from_millis(5).unwrap());
        assert_eq!(value.windows, vec![Window::Global]);
        assert_eq!(value.value, serde_json::json!(7));
    }

    #[test]
    fn test_output_tag_identity() {
        assert_eq!(OutputTag::new("errors"), OutputTag::from("errors"));
        assert_eq!(OutputTag::new("errors").to_string(), "errors");
    }
}
