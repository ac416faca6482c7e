use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fmt::Display;

const DISPLAY_FORMAT: &str = "%b %-d, %I:%M %p";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Short display form of a stored history timestamp in local time,
/// e.g. `"Oct 18, 03:05 PM"`.
pub fn format_timestamp(raw: &str) -> String {
    format_timestamp_in(raw, &Local)
}

/// Offset-qualified timestamps are converted into `tz`; timestamps without
/// an offset are already wall-clock time and are rendered as written.
/// Unparseable input is returned unchanged.
pub fn format_timestamp_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.with_timezone(tz).format(DISPLAY_FORMAT).to_string();
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return naive.format(DISPLAY_FORMAT).to_string();
        }
    }
    tracing::debug!(timestamp = raw, "unparseable history timestamp");
    raw.to_string()
}
