//! Runtime values of the template language.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::document::{format_f64, parse_f64};

/// Text printed for a missing value.
pub const NO_VALUE: &str = "<no value>";

/// A value produced while executing a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// Missing field or `nil`
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer literal or integer result
    Int(i64),
    /// Float; every JSON number reads as a float
    Float(f64),
    /// String
    Str(String),
    /// Instant in UTC
    Time(DateTime<Utc>),
    /// JSON array or object
    Json(Value),
}

impl TemplateValue {
    /// Convert a JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => TemplateValue::Nil,
            Value::Bool(b) => TemplateValue::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(TemplateValue::Float)
                .unwrap_or(TemplateValue::Nil),
            Value::String(s) => TemplateValue::Str(s.clone()),
            other => TemplateValue::Json(other.clone()),
        }
    }

    /// Truthiness used by `if`, `and`, `or`, and `not`.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Nil => false,
            TemplateValue::Bool(b) => *b,
            TemplateValue::Int(i) => *i != 0,
            TemplateValue::Float(f) => *f != 0.0,
            TemplateValue::Str(s) => !s.is_empty(),
            TemplateValue::Time(_) => true,
            TemplateValue::Json(Value::Array(items)) => !items.is_empty(),
            TemplateValue::Json(Value::Object(map)) => !map.is_empty(),
            TemplateValue::Json(_) => false,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TemplateValue::Int(i) => Some(*i as f64),
            TemplateValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Lenient numeric conversion: numbers, numeric strings, else 0.
    pub fn to_float_lenient(&self) -> f64 {
        match self {
            TemplateValue::Int(i) => *i as f64,
            TemplateValue::Float(f) => *f,
            TemplateValue::Str(s) => parse_f64(s).unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TemplateValue::Nil => "nil",
            TemplateValue::Bool(_) => "bool",
            TemplateValue::Int(_) => "int",
            TemplateValue::Float(_) => "float64",
            TemplateValue::Str(_) => "string",
            TemplateValue::Time(_) => "time",
            TemplateValue::Json(Value::Array(_)) => "array",
            TemplateValue::Json(_) => "map",
        }
    }

    /// Compare two values of compatible kinds.
    ///
    /// Integers and floats compare numerically; strings lexically; times
    /// chronologically. Other pairs are incomparable.
    pub fn compare(&self, other: &TemplateValue) -> Option<Ordering> {
        match (self, other) {
            (TemplateValue::Str(a), TemplateValue::Str(b)) => Some(a.cmp(b)),
            (TemplateValue::Time(a), TemplateValue::Time(b)) => Some(a.cmp(b)),
            (TemplateValue::Bool(a), TemplateValue::Bool(b)) => Some(a.cmp(b)),
            (TemplateValue::Int(a), TemplateValue::Int(b)) => Some(a.cmp(b)),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

/// The zero time, `0001-01-01T00:00:00Z`.
pub fn zero_time() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateValue::Nil => f.write_str(NO_VALUE),
            TemplateValue::Bool(b) => write!(f, "{b}"),
            TemplateValue::Int(i) => write!(f, "{i}"),
            TemplateValue::Float(v) => f.write_str(&format_f64(*v)),
            TemplateValue::Str(s) => f.write_str(s),
            TemplateValue::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            TemplateValue::Json(v) => write!(f, "{v}"),
        }
    }
}
