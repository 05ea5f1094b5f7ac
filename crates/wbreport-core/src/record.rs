//! Raw statistics records and date normalisation.
//!
//! Every statistics endpoint returns loosely-typed JSON objects whose keys
//! differ per endpoint. [`MetricRecord`] keeps the object as-is and offers
//! lenient typed accessors, so a missing or oddly-typed field degrades to
//! "absent" instead of failing the whole batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Day-bucket format used for report rows and user-facing output.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", DISPLAY_DATE_FORMAT];

/// One raw record from a statistics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord(Map<String, Value>);

impl MetricRecord {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps a JSON value if it is an object; anything else is rejected.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Reads a numeric field. Numeric strings are accepted.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Reads the first of `keys` that holds a non-zero number.
    #[must_use]
    pub fn first_number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .filter_map(|k| self.number(k))
            .find(|v| *v != 0.0)
    }

    /// Reads a boolean flag; absent or non-boolean values are `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The article identifier (`nmId`) as a comparable string key.
    #[must_use]
    pub fn article(&self) -> Option<String> {
        match self.get("nmId")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// The record's `date` field normalised to a calendar day.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        self.text("date").and_then(normalize_date)
    }
}

impl From<Map<String, Value>> for MetricRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Parses the date shapes the statistics API emits into a calendar day.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamps,
/// plain `YYYY-MM-DD` dates, and already-formatted `DD.MM.YYYY` dates.
/// Timestamps keep their local date; no timezone conversion is applied.
#[must_use]
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Renders a day in [`DISPLAY_DATE_FORMAT`].
#[must_use]
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}
