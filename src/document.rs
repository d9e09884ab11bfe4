//! Documents and field resolution.
//!
//! A [`Document`] is a JSON object streamed from a loader. Conditions,
//! controls, and aggregations address fields with dot-separated paths such as
//! `seller.address.city`; [`resolve_raw`] returns the JSON value found at a
//! path and [`resolve_str`] returns its scalar string form.
//!
//! # Examples
//!
//! ```
//! use halberd::document::{resolve_raw, resolve_str, Document};
//! use serde_json::json;
//!
//! let doc: Document = json!({"user": {"name": "ada", "age": 36}})
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//!
//! assert_eq!(resolve_str(&doc, "user.name").as_deref(), Some("ada"));
//! assert_eq!(resolve_str(&doc, "user.age").as_deref(), Some("36"));
//! assert!(resolve_str(&doc, "user").is_none());
//! assert!(resolve_raw(&doc, "user").is_some());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};

/// A decoded JSON document.
pub type Document = Map<String, Value>;

/// Field the engine writes the relevance score to.
pub const SCORE_FIELD: &str = "_score";

/// Identifier field carried into unnested documents.
pub const ID_FIELD: &str = "_id";

/// Resolve a dot-separated path to the raw JSON value it names.
///
/// Every intermediate segment must name an object.
pub fn resolve_raw<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Resolve a dot-separated path to the string form of a scalar value.
///
/// Strings, numbers, and booleans resolve; objects, arrays, and null do not.
pub fn resolve_str(doc: &Document, path: &str) -> Option<String> {
    resolve_raw(doc, path).and_then(scalar_to_string)
}

/// Resolve a path and parse the scalar string form as a float.
pub fn resolve_f64(doc: &Document, path: &str) -> Option<f64> {
    resolve_str(doc, path).and_then(|s| parse_f64(&s))
}

/// String form of a scalar JSON value.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format_json_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Format a JSON number in shortest form without an exponent.
pub fn format_json_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(format_f64).unwrap_or_default()
    }
}

/// Format a float in shortest form: `4.0` prints as `4`, `2.5` as `2.5`.
pub fn format_f64(value: f64) -> String {
    format!("{value}")
}

/// Parse a float, accepting surrounding whitespace.
pub fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Convert a number or numeric string to a float.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64(s),
        _ => None,
    }
}

/// Naive date-time layouts accepted after RFC 3339, interpreted as UTC.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S"];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a date in one of the accepted layouts.
///
/// Layouts, tried in order: RFC 3339, `YYYY-MM-DD`, `M/D/YYYY` (one or two
/// digit month and day), and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    None
}

/// Read the `_score` of a document, 0 when absent.
pub fn score_of(doc: &Document) -> f64 {
    doc.get(SCORE_FIELD).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Write a score as the `_score` field.
pub fn set_score(doc: &mut Document, score: f64) {
    let value = Number::from_f64(score)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0));
    doc.insert(SCORE_FIELD.to_string(), value);
}
