//! `term` and `filter` conditions.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::document::{Document, parse_date, parse_f64, resolve_str};
use crate::query::dsl::{FieldCondition, Operation};
use crate::query::subquery::execute_subquery;
use crate::query::{Condition, EvalContext, Evaluation};

impl Condition for FieldCondition {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        let Some(doc_value) = resolve_str(doc, &self.field) else {
            return Evaluation::NO_MATCH;
        };
        let operation = self.operation();

        let Some(subquery) = &self.subquery else {
            return Evaluation::from_bool(compare_values(&doc_value, self.value(), operation));
        };

        if !operation.is_membership() {
            debug!(field = %self.field, %operation, "subquery ignored outside In/NotIn");
            return Evaluation::NO_MATCH;
        }
        match execute_subquery(subquery, ctx) {
            Ok(values) => {
                let found = values.contains(&doc_value);
                Evaluation::from_bool(if operation == Operation::In { found } else { !found })
            }
            Err(e) => {
                warn!(field = %self.field, index = %subquery.index, error = %e, "subquery failed");
                Evaluation::NO_MATCH
            }
        }
    }
}

/// Order two values as dates when both parse as dates, else as numbers
/// when both parse as numbers.
fn typed_ordering(left: &str, right: &str) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (parse_date(left), parse_date(right)) {
        return Some(l.cmp(&r));
    }
    match (parse_f64(left), parse_f64(right)) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => None,
    }
}

/// Apply `operation` to a document value and a condition value.
///
/// Equality and ordering compare chronologically when both sides are dates
/// and numerically when both are numbers. Equality otherwise falls back to
/// exact string comparison, while ordering of untyped values never matches.
/// `In`/`NotIn` treat the condition value as a comma-separated list.
///
/// # Examples
///
/// ```
/// use halberd::query::{compare_values, Operation};
///
/// assert!(compare_values("10", "9", Operation::GreaterThan));
/// assert!(compare_values("2024-01-02", "2023-12-31T10:00:00Z", Operation::GreaterThan));
/// assert!(compare_values("4", "4.0", Operation::Equal));
/// assert!(compare_values("blue", "red, blue", Operation::In));
/// assert!(!compare_values("apple", "banana", Operation::LessThan));
/// ```
pub fn compare_values(left: &str, right: &str, operation: Operation) -> bool {
    match operation {
        Operation::Contains => left.contains(right),
        Operation::StartsWith => left.starts_with(right),
        Operation::EndsWith => left.ends_with(right),
        Operation::In | Operation::NotIn => {
            let found = right.split(',').map(str::trim).any(|item| item == left);
            if operation == Operation::In { found } else { !found }
        }
        Operation::Equal => typed_ordering(left, right)
            .map(|o| o == Ordering::Equal)
            .unwrap_or(left == right),
        Operation::NotEqual => typed_ordering(left, right)
            .map(|o| o != Ordering::Equal)
            .unwrap_or(left != right),
        Operation::GreaterThan => typed_ordering(left, right) == Some(Ordering::Greater),
        Operation::LessThan => typed_ordering(left, right) == Some(Ordering::Less),
        Operation::GreaterThanOrEqual => {
            matches!(typed_ordering(left, right), Some(Ordering::Greater | Ordering::Equal))
        }
        Operation::LessThanOrEqual => {
            matches!(typed_ordering(left, right), Some(Ordering::Less | Ordering::Equal))
        }
    }
}
