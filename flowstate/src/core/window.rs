//! Window identities.

use crate::utils::{format_iso8601, global_window_max_timestamp, Timestamp, TIMESTAMP_MIN_VALUE};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the window an element or side input belongs to.
///
/// The runtime treats windows as opaque keys: they are compared, hashed
/// and encoded, never interpreted beyond `max_timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Window {
    /// The single window spanning all of event time.
    Global,
    /// A half-open interval `[start, end)`.
    Interval {
        /// Inclusive start.
        start: Timestamp,
        /// Exclusive end.
        end: Timestamp,
    },
}

impl Window {
    /// Creates an interval window.
    #[must_use]
    pub fn interval(start: Timestamp, end: Timestamp) -> Self {
        Self::Interval { start, end }
    }

    /// Returns the latest instant that still belongs to this window.
    #[must_use]
    pub fn max_timestamp(&self) -> Timestamp {
        match self {
            Self::Global => global_window_max_timestamp(),
            Self::Interval { end, .. } => end
                .checked_sub_signed(Duration::milliseconds(1))
                .unwrap_or(TIMESTAMP_MIN_VALUE),
        }
    }

    /// Returns true for the global window.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Interval { start, end } => {
                write!(f, "[{}, {})", format_iso8601(start), format_iso8601(end))
            }
        }
    }
}
