use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 string (`2024-12-01T18:30:00Z`).
///
/// Stored timestamps are compared as strings in SQL, so every writer must use
/// the same width.
pub fn now_rfc3339() -> String {
    to_rfc3339(&Utc::now())
}

pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Timestamp `hours` before now, in the stored format.
pub fn cutoff_rfc3339(hours: i64) -> String {
    to_rfc3339(&(Utc::now() - Duration::hours(hours)))
}

/// Human readable date for event cards; falls back to the raw value.
pub fn format_timestamp(stored: &str) -> String {
    DateTime::parse_from_rfc3339(stored)
        .map(|dt| dt.with_timezone(&Utc).format("%d %B %Y").to_string())
        .unwrap_or_else(|_| stored.to_string())
}
