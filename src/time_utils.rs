// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Cutoff timestamp `days` before `now`, in the sortable string form used by
/// event documents.
pub fn cutoff(now: DateTime<Utc>, days: i64) -> String {
    format_utc_rfc3339(now - chrono::Duration::days(days))
}

/// Parse an ISO 8601 timestamp with or without offset (naive values are UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Calendar day of an ISO 8601 timestamp.
pub fn day_of(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date_naive())
}

/// Instant of a stored timestamp.
///
/// Accepts RFC3339 strings, `{seconds, nanos}` / `{_seconds}` maps and epoch
/// seconds.
pub fn stored_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_timestamp(raw),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::Object(map) => map
            .get("seconds")
            .or_else(|| map.get("_seconds"))
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM:SS`. Values that are not
/// recognizable timestamps are rendered as-is.
pub fn format_timestamp(value: &Value) -> String {
    match stored_timestamp(value) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => match value {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        },
    }
}
