//! Time bucketing for persisted map documents.

use chrono::{DateTime, TimeZone, Utc};

use crate::{MapError, MapResult};

/// A run timestamp truncated to the persistence interval.
pub type TimeBucket = DateTime<Utc>;

/// Truncate `dt` down to the start of its `interval_minutes` bucket.
///
/// Seconds and sub-seconds are zeroed, so with a 10 minute interval
/// 12:37:45.5 becomes 12:30:00.
pub fn time_bucket(dt: DateTime<Utc>, interval_minutes: u32) -> MapResult<TimeBucket> {
    if interval_minutes == 0 {
        return Err(MapError::InvalidTime(
            "bucket interval must be positive".to_string(),
        ));
    }
    let interval_secs = i64::from(interval_minutes) * 60;
    let secs = dt.timestamp();
    let floored = secs - secs.rem_euclid(interval_secs);

    Utc.timestamp_opt(floored, 0)
        .single()
        .ok_or_else(|| MapError::InvalidTime(format!("cannot bucket {}", dt)))
}
