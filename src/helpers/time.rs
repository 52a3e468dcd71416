use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub fn now_u64() -> u64 {
    now_i64().max(0) as u64
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// RFC3339 rendering of a unix timestamp, empty when out of range.
pub fn unix_to_rfc3339(unix_ts: u64) -> String {
    DateTime::from_timestamp(unix_ts as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
