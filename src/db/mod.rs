pub mod alerts;
pub mod connection;
pub mod official;
pub mod reports;
pub mod samples;

use chrono::{DateTime, Utc};

/// Timestamps are stored as unix milliseconds.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
