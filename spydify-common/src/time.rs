//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as fractional seconds since the Unix epoch
///
/// This is the representation used by the persisted request log.
pub fn epoch_seconds() -> f64 {
    to_epoch_seconds(now())
}

/// Convert a UTC timestamp to fractional seconds since the Unix epoch
pub fn to_epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

/// Convert fractional seconds to a duration, clamping negatives to zero
pub fn secs_to_duration(secs: f64) -> std::time::Duration {
    if secs.is_finite() && secs > 0.0 {
        std::time::Duration::from_secs_f64(secs)
    } else {
        std::time::Duration::ZERO
    }
}
