//! Wedding-date normalization.
//!
//! Profiles arrive with the wedding date in whatever shape the client stored
//! it: a plain string, a timestamp object carrying epoch seconds, or an
//! in-process value that knows how to convert itself. [`normalize_date`]
//! coerces all of them into one canonical string (RFC 3339, UTC, millisecond
//! precision) and reports "no date" as `None` instead of failing.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Placeholder written into the generation context when no date is known.
pub const UNDECIDED_DATE: &str = "TBD";

/// A value that can produce a calendar date on demand.
pub trait ToDate: Send + Sync + fmt::Debug {
    /// Convert to a UTC instant, or `None` when the value holds no date.
    fn to_date(&self) -> Option<DateTime<Utc>>;
}

impl ToDate for DateTime<Utc> {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl ToDate for NaiveDate {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        self.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
    }
}

/// The representations a wedding date may arrive in.
#[derive(Debug, Clone)]
pub enum RawDate {
    /// Already textual; passed through untouched.
    Text(String),
    /// Exposes a zero-argument conversion to a date.
    Convertible(Arc<dyn ToDate>),
    /// A timestamp object's `seconds` field.
    EpochSeconds(f64),
    /// Anything else; subject to a best-effort parse.
    Other(Value),
}

impl RawDate {
    /// Classify a JSON value. `null` means "no date" and yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_f64);
                match seconds {
                    Some(secs) => Some(Self::EpochSeconds(secs)),
                    None => Some(Self::Other(value.clone())),
                }
            }
            other => Some(Self::Other(other.clone())),
        }
    }
}

/// Normalize a raw date into its canonical string form.
///
/// Rules, first match wins: text passes through, convertible values are
/// converted, epoch seconds are scaled to milliseconds, anything else gets a
/// generic parse. Returns `None` when nothing yields a date.
pub fn normalize_date(raw: &RawDate) -> Option<String> {
    match raw {
        RawDate::Text(s) => Some(s.clone()),
        RawDate::Convertible(inner) => inner.to_date().map(format_canonical),
        RawDate::EpochSeconds(secs) => from_epoch_millis(secs * 1000.0).map(format_canonical),
        RawDate::Other(value) => parse_generic(value).map(format_canonical),
    }
}

/// Normalize an optional JSON date field.
pub fn normalize_json_date(value: Option<&Value>) -> Option<String> {
    value.and_then(RawDate::from_json).and_then(|raw| normalize_date(&raw))
}

/// Canonical textual form: `2026-06-14T00:00:00.000Z`.
pub fn format_canonical(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a date string as RFC 3339 or as a bare `YYYY-MM-DD` calendar day.
pub fn parse_calendar_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.to_date())
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

fn parse_generic(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        // Bare numbers are epoch milliseconds.
        Value::Number(n) => n.as_f64().and_then(from_epoch_millis),
        Value::Object(map) => ["date", "value", "iso"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_str))
            .find_map(parse_calendar_date),
        _ => None,
    }
}
