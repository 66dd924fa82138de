//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a stored epoch-millisecond value to a whole-second UTC timestamp
///
/// Sub-second precision is dropped. Returns `None` when the value falls
/// outside the range chrono can represent.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(millis.div_euclid(1000), 0)
}
