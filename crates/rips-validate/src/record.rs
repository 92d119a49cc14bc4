//! Read-only accessors over one JSON record of the document.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

use rips_model::value_to_string;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMAT: &str = "%Y-%m-%d";

static NULL: Value = Value::Null;

/// One object of the document plus its position within its array.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a Map<String, Value>,
    position: usize,
}

impl<'a> Record<'a> {
    pub fn new(fields: &'a Map<String, Value>, position: usize) -> Self {
        Self { fields, position }
    }

    /// Zero-based index within the enclosing array.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The raw value, `null` when the key is absent.
    pub fn value(&self, field: &str) -> &'a Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Trimmed textual form; `None` for null or blank values.
    pub fn text(&self, field: &str) -> Option<String> {
        let text = value_to_string(self.value(field))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Numeric value; numeric strings are accepted.
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.value(field) {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        parse_date(&self.text(field)?)
    }

    pub fn datetime(&self, field: &str) -> Option<NaiveDateTime> {
        parse_datetime(&self.text(field)?)
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Whole years between `birth` and `on`: floor(days / 365.25).
pub fn age_in_years(birth: NaiveDate, on: NaiveDate) -> i64 {
    let days = (on - birth).num_days();
    (days as f64 / 365.25).floor() as i64
}
