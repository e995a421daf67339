//! Relative timestamps ("5m", "3d") and profile join dates.

use chrono::{DateTime, Utc};

const UNITS: [(i64, &str); 5] = [
    (31_536_000, "y"),
    (2_592_000, "mo"),
    (86_400, "d"),
    (3_600, "h"),
    (60, "m"),
];

/// Age of `ts` relative to now. Absent timestamps render as `""`.
pub fn time_ago(ts: Option<DateTime<Utc>>) -> String {
    time_ago_at(ts, Utc::now())
}

/// Largest unit the elapsed time fills at least once, truncated toward
/// zero. Future timestamps fall through to (negative) seconds.
pub fn time_ago_at(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    let seconds = (now - ts).num_seconds();

    UNITS
        .iter()
        .find(|(unit, _)| seconds >= *unit)
        .map(|(unit, suffix)| format!("{}{}", seconds / unit, suffix))
        .unwrap_or_else(|| format!("{seconds}s"))
}

/// "Member since" label, e.g. "January 2024".
pub fn month_year(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|ts| ts.format("%B %Y").to_string()).unwrap_or_default()
}
