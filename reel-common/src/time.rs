//! Timestamp utilities
//!
//! Review timestamps are stored as microseconds since the Unix epoch so the
//! store can hand out strictly increasing values with integer arithmetic in
//! a single SQL statement.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a timestamp to microseconds since the Unix epoch
pub fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// Convert microseconds since the Unix epoch back to a timestamp
///
/// Out-of-range values clamp to the Unix epoch rather than failing; they can
/// only come from a corrupted row.
pub fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
