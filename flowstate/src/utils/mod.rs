//! Timestamp helpers shared by state, windowing and timers.

pub mod timestamps;

pub use timestamps::{
    format_iso8601, from_millis, global_window_max_timestamp, now_utc, Timestamp,
    TIMESTAMP_MAX_VALUE, TIMESTAMP_MIN_VALUE,
};
