//! Output observer trait and implementations.

use crate::core::{OutputTag, WindowedValue};
use std::sync::Arc;
use tracing::{debug, info, trace, Level};

/// Receives a notification for every main and side output element.
///
/// Both methods default to doing nothing.
pub trait OutputObserver: Send + Sync {
    /// Called once per element emitted to the main output.
    fn note_output(&self, _output: &WindowedValue) {}

    /// Called once per element emitted to a side output.
    fn note_side_output(&self, _tag: &OutputTag, _output: &WindowedValue) {}
}

impl<T> OutputObserver for Arc<T>
where
    T: OutputObserver + ?Sized,
{
    fn note_output(&self, output: &WindowedValue) {
        (**self).note_output(output);
    }

    fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        (**self).note_side_output(tag, output);
    }
}

/// An observer that ignores all outputs.
///
/// Used as the default when no observer is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpOutputObserver;

impl OutputObserver for NoOpOutputObserver {}

/// An observer that logs outputs using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingOutputObserver {
    level: Level,
}

impl Default for LoggingOutputObserver {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingOutputObserver {
    /// Creates a new logging observer with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level logging observer.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_output(&self, tag: Option<&OutputTag>, output: &WindowedValue) {
        let tag = tag.map_or("main", OutputTag::name);
        match self.level {
            Level::TRACE => {
                trace!(
                    output_tag = %tag,
                    timestamp = %output.timestamp,
                    value = %output.value,
                    "Output emitted"
                );
            }
            Level::DEBUG => {
                debug!(
                    output_tag = %tag,
                    timestamp = %output.timestamp,
                    value = %output.value,
                    "Output emitted"
                );
            }
            _ => {
                info!(
                    output_tag = %tag,
                    timestamp = %output.timestamp,
                    value = %output.value,
                    "Output emitted"
                );
            }
        }
    }
}

impl OutputObserver for LoggingOutputObserver {
    fn note_output(&self, output: &WindowedValue) {
        self.log_output(None, output);
    }

    fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        self.log_output(Some(tag), output);
    }
}

/// Forwards each notification to two observers in order.
pub(crate) struct TeeOutputObserver<A, B> {
    pub(crate) first: A,
    pub(crate) second: B,
}

impl<A, B> OutputObserver for TeeOutputObserver<A, B>
where
    A: OutputObserver,
    B: OutputObserver,
{
    fn note_output(&self, output: &WindowedValue) {
        self.first.note_output(output);
        self.second.note_output(output);
    }

    fn note_side_output(&self, tag: &OutputTag, output: &WindowedValue) {
        self.first.note_side_output(tag, output);
        self.second.note_side_output(tag, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingOutputObserver;
    use crate::utils::now_utc;

    fn element() -> WindowedValue {
        WindowedValue::in_global_window(serde_json::json!({"id": 1}), now_utc())
    }

    #[test]
    fn test_noop_observer() {
        let observer = NoOpOutputObserver;
        observer.note_output(&element());
        observer.note_side_output(&OutputTag::new("side"), &element());
        // Should not panic
    }

    #[test]
    fn test_logging_observer() {
        let observer = LoggingOutputObserver::info();
        observer.note_output(&element());
        observer.note_side_output(&OutputTag::new("side"), &element());
        // Should not panic
    }

    #[test]
    fn test_tee_forwards_to_both() {
        let first = Arc::new(CollectingOutputObserver::new());
        let second = Arc::new(CollectingOutputObserver::new());
        let tee = TeeOutputObserver {
            first: Arc::clone(&first),
            second: Arc::clone(&second),
        };

        tee.note_output(&element());
        tee.note_side_output(&OutputTag::new("side"), &element());

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }
}
