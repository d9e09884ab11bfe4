//! `range` condition.

use crate::document::{Document, parse_date, parse_f64, resolve_str};
use crate::query::dsl::Range;
use crate::query::{Condition, EvalContext, Evaluation};

/// Check `from <= value < to` with bounds parsed by `parse`. A present bound
/// that does not parse fails the check.
fn within<T, F>(value: T, from: Option<&str>, to: Option<&str>, parse: F) -> bool
where
    T: PartialOrd,
    F: Fn(&str) -> Option<T>,
{
    if let Some(from) = from {
        match parse(from) {
            Some(from) if value >= from => {}
            _ => return false,
        }
    }
    if let Some(to) = to {
        match parse(to) {
            Some(to) if value < to => {}
            _ => return false,
        }
    }
    true
}

impl Condition for Range {
    fn evaluate(&self, doc: &Document, _ctx: &EvalContext<'_>) -> Evaluation {
        let Some(value) = resolve_str(doc, &self.field) else {
            return Evaluation::NO_MATCH;
        };
        let from = self.from.as_deref().filter(|s| !s.is_empty());
        let to = self.to.as_deref().filter(|s| !s.is_empty());

        let matched = if let Some(date) = parse_date(&value) {
            within(date, from, to, parse_date)
        } else if let Some(number) = parse_f64(&value) {
            within(number, from, to, parse_f64)
        } else {
            false
        };
        Evaluation::from_bool(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{Fixture, case, doc};
    use serde_json::json;

    fn matches(range: serde_json::Value, d: serde_json::Value) -> bool {
        let fixture = Fixture::new();
        case(json!({ "range": range })).evaluate(&doc(d), &fixture.ctx()).matched
    }

    #[test]
    fn test_numeric_half_open() {
        let range = json!({"field": "price", "from": 10, "to": 20});
        assert!(matches(range.clone(), json!({"price": 10})));
        assert!(matches(range.clone(), json!({"price": "19.99"})));
        assert!(!matches(range.clone(), json!({"price": 20})));
        assert!(!matches(range.clone(), json!({"price": 9})));
        assert!(!matches(range, json!({"price": "cheap"})));
    }

    #[test]
    fn test_open_bounds() {
        assert!(matches(json!({"field": "n", "from": 5}), json!({"n": 1000})));
        assert!(matches(json!({"field": "n", "to": "5"}), json!({"n": -3})));
        assert!(matches(json!({"field": "n"}), json!({"n": 0})));
        assert!(!matches(json!({"field": "n"}), json!({"m": 0})));
    }

    #[test]
    fn test_date_range() {
        let range = json!({"field": "at", "from": "2024-01-01", "to": "2024-02-01"});
        assert!(matches(range.clone(), json!({"at": "2024-01-15T12:00:00Z"})));
        assert!(matches(range.clone(), json!({"at": "01/01/2024"})));
        assert!(!matches(range, json!({"at": "2024-02-01"})));

        // date values need date bounds
        assert!(!matches(json!({"field": "at", "from": 5}), json!({"at": "2024-01-15"})));
    }
}
