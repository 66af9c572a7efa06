//! Timestamp helpers.
//!
//! Message documents carry their timestamp as an ISO-8601 string with
//! millisecond precision and a `Z` suffix (`2024-05-01T09:30:12.345Z`), which
//! sorts lexicographically in time order.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Render an instant the way message documents store it.
pub fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Display form of a timestamp: minute precision, `T` replaced by a space.
///
/// `2024-05-01T09:30:12.345Z` becomes `2024-05-01 09:30`.
pub fn format_minute(iso: &str) -> String {
    let truncated: String = iso.chars().take(16).collect();
    truncated.replacen('T', " ", 1)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Epoch milliseconds (as written by older clients) to ISO-8601.
pub fn millis_to_iso(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms).single().map(to_iso)
}
