//! Timer facility handed to steps by their execution context.
//!
//! The runtime does not fire timers itself. An execution context either
//! carries a [`TimerManager`] supplied by the harness, or reports that the
//! caller must emulate timers.

use crate::state::StateKey;
use crate::utils::Timestamp;
use serde::{Deserialize, Serialize};

/// The time domain a timer fires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeDomain {
    /// Fires when the input watermark passes the timestamp.
    EventTime,
    /// Fires when wall-clock time passes the timestamp.
    ProcessingTime,
}

/// A timer registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerData {
    /// The key the timer belongs to.
    pub key: StateKey,
    /// Identifies the timer within its key.
    pub tag: String,
    /// When the timer should fire.
    pub timestamp: Timestamp,
    /// The time domain.
    pub domain: TimeDomain,
}

impl TimerData {
    /// Creates a new timer registration.
    #[must_use]
    pub fn new(
        key: StateKey,
        tag: impl Into<String>,
        timestamp: Timestamp,
        domain: TimeDomain,
    ) -> Self {
        Self {
            key,
            tag: tag.into(),
            timestamp,
            domain,
        }
    }
}

/// Sets and deletes timers on behalf of steps.
pub trait TimerManager: Send + Sync {
    /// Registers or replaces a timer.
    fn set_timer(&self, timer: TimerData);

    /// Removes a timer if it is registered.
    fn delete_timer(&self, timer: &TimerData);
}
