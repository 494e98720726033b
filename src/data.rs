use std::{
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Earliest and latest Gregorian years accepted by the lenient date parser.
/// Jalali text such as `1402/01/05` must not be mistaken for a Gregorian date.
const MIN_DATE_YEAR: i32 = 1678;
const MAX_DATE_YEAR: i32 = 2261;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Value {
    /// Builds a typed cell from raw spreadsheet text. A cell is typed only
    /// when its display text is exactly the trimmed source text, so `007`,
    /// `1.50` or `۱۲` stay strings and are exported as written.
    pub fn from_raw(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        let typed = parse_number(trimmed)
            .map(Value::Number)
            .or_else(|| parse_date_text(trimmed).map(Value::Date));
        match typed {
            Some(value) if value.as_display() == trimmed => value,
            _ => Value::String(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Missing => String::new(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_bits(*a) == number_bits(*b),
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Number(n) => number_bits(*n).hash(state),
            Value::Date(d) => d.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

fn number_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Maps Persian (`۰`-`۹`) and Arabic-Indic (`٠`-`٩`) digits to ASCII digits.
pub fn normalize_digits(value: &str) -> Cow<'_, str> {
    if !value.chars().any(is_eastern_digit) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .chars()
            .map(|ch| match ch {
                '\u{06F0}'..='\u{06F9}' => ascii_digit(ch as u32 - 0x06F0),
                '\u{0660}'..='\u{0669}' => ascii_digit(ch as u32 - 0x0660),
                '\u{066B}' => '.',
                other => other,
            })
            .collect(),
    )
}

fn is_eastern_digit(ch: char) -> bool {
    matches!(ch, '\u{06F0}'..='\u{06F9}' | '\u{0660}'..='\u{0669}' | '\u{066B}')
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

fn parse_number(text: &str) -> Option<f64> {
    let normalized = normalize_digits(text.trim());
    normalized
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })?;
    (MIN_DATE_YEAR..=MAX_DATE_YEAR)
        .contains(&date.year())
        .then_some(date)
}

/// Generic lenient date parsing used by date-range filtering and timelines.
/// Anything that is not a plausible Gregorian date becomes `None`.
pub fn parse_lenient_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::String(text) => parse_date_text(&normalize_digits(text)),
        Value::Number(_) | Value::Missing => None,
    }
}

/// Numeric coercion shared by range filtering and aggregation. Callers decide
/// whether a `None` drops the row or counts as zero.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.is_finite().then_some(*number),
        Value::String(text) => parse_number(text),
        Value::Date(_) | Value::Missing => None,
    }
}
