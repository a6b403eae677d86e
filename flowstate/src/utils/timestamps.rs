//! Event-time instants.
//!
//! Instants are UTC with millisecond precision wherever they cross a
//! persistence boundary.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// An instant in event time.
pub type Timestamp = DateTime<Utc>;

/// The largest representable instant. Values stored with this bound are
/// not time-limited.
pub const TIMESTAMP_MAX_VALUE: Timestamp = DateTime::<Utc>::MAX_UTC;

/// The smallest representable instant.
pub const TIMESTAMP_MIN_VALUE: Timestamp = DateTime::<Utc>::MIN_UTC;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Builds a timestamp from milliseconds since the Unix epoch.
///
/// Returns `None` if the value is outside the representable range.
#[must_use]
pub fn from_millis(millis: i64) -> Option<Timestamp> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Returns the end of the global window: one day before the maximum
/// instant, leaving room for timers set past the last element.
#[must_use]
pub fn global_window_max_timestamp() -> Timestamp {
    TIMESTAMP_MAX_VALUE - Duration::days(1)
}

/// Formats a timestamp as ISO 8601 string.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3f+00:00").to_string()
}
