//! Clock for registry timestamps.

use chrono::{DateTime, SecondsFormat, Utc};

/// Overrides the clock with a fixed Unix timestamp so test output is stable.
pub const TEST_EPOCH_VAR: &str = "ERK_TEST_EPOCH";

/// Current time, or the `ERK_TEST_EPOCH` instant when that is set to a valid
/// timestamp.
pub fn now() -> DateTime<Utc> {
    std::env::var(TEST_EPOCH_VAR)
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

/// `assigned_at` value for a slot: RFC 3339 in UTC, whole seconds.
pub fn now_iso8601() -> String {
    format_iso8601(now())
}

fn format_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
