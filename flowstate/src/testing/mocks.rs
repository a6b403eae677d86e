//! Recording observers.

use crate::core::{OutputTag, WindowedValue};
use crate::outputs::OutputObserver;
use parking_lot::RwLock;

/// One recorded notification. `tag` is `None` for the main output.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedOutput {
    /// The side output tag, if any.
    pub tag: Option<OutputTag>,
    /// The element.
    pub output: WindowedValue,
}

/// An observer that records every notification, for tests.
#[derive(Debug, Default)]
pub struct CollectingOutputObserver {
    outputs: RwLock<Vec<RecordedOutput>>,
}

impl CollectingOutputObserver {
    /// Creates a new collecting observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded notifications in call order.
    #[must_use]
    pub fn outputs(&self) -> Vec<RecordedOutput> {
        self.outputs.read().clone()
    }

    /// Returns main output elements in call order.
    #[must_use]
    pub fn main_outputs(&self) -> Vec<WindowedValue> {
        self.outputs
            .read()
            .iter()
            .filter(|recorded| recorded.tag.is_none())
            .map(|recorded| recorded.output.clone())
            .collect()
    }

    /// Returns side output elements for a tag in call order.
    #[must_use]
    pub fn side_outputs(&self, tag: &OutputTag) -> Vec<WindowedValue> {
        self.outputs
            .read()
            .iter()
            .filter(|recorded| recorded.tag.as_ref() == Some(tag))
            .map(|recorded| recorded.output.clone())
            .collect()
    }

    /// Returns the number of recorded notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.read().is_empty()
    }

    /// Clears all recorded notifications.
    pub fn clear(&self) {
        self.outputs.write().clear();
    }
}

impl OutputObserver for CollectingOutputObserver {
    fn note_output(&self, output: &WindowedValue) {
        self.outputs.write().push(RecordedOutput {
            tag: None,
            output: output.clone(),
        });
    }

    fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        self.outputs.write().push(RecordedOutput {
            tag: Some(tag.clone()),
            output: output.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_millis;

    #[test]
    fn test_collecting_observer_filters() {
        let observer = CollectingOutputObserver::new();
        let errors = OutputTag::new("errors");
        let element = |v: i64| {
            WindowedValue::in_global_window(serde_json::json!(v), from_millis(v).unwrap())
        };

        observer.note_output(&element(1));
        observer.note_side_output(&errors, &element(2));
        observer.note_output(&element(3));

        assert_eq!(observer.len(), 3);
        assert_eq!(observer.main_outputs(), vec![element(1), element(3)]);
        assert_eq!(observer.side_outputs(&errors), vec![element(2)]);
        assert!(observer.side_outputs(&OutputTag::new("other")).is_empty());

        observer.clear();
        assert!(observer.is_empty());
    }
}
