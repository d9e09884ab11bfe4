//! Subqueries feeding `In`/`NotIn` conditions.

use ahash::AHashSet;
use tracing::{debug, warn};

use crate::document::resolve_str;
use crate::error::{HalberdError, Result};
use crate::loader::IteratorGuard;
use crate::query::dsl::Query;
use crate::query::{Condition, EvalContext};

/// Run `subquery` against its own index and collect the `resultField` value
/// of every matching document.
///
/// Loader failures are returned to the caller, which treats them as a
/// non-match. Per-document decode errors are logged and skipped. Beyond
/// `max_subquery_depth` levels of nesting the result set is empty.
pub fn execute_subquery(subquery: &Query, ctx: &EvalContext<'_>) -> Result<AHashSet<String>> {
    let result_field = subquery
        .result_field
        .as_deref()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| HalberdError::query("subquery requires 'resultField'"))?;

    if ctx.depth >= ctx.config.max_subquery_depth {
        warn!(
            index = %subquery.index,
            depth = ctx.depth,
            "subquery nesting limit reached; using an empty result set"
        );
        return Ok(AHashSet::new());
    }

    let index = ctx.index.with_id(&subquery.index);
    let iterator = ctx.loader.load(ctx.cancel, &index, &subquery.composite)?;
    let mut documents = IteratorGuard::new(iterator);
    let child = ctx.descend(&index);

    let mut values = AHashSet::new();
    for item in &mut documents {
        ctx.cancel.check()?;
        let doc = match item {
            Ok(doc) => doc,
            Err(e) => {
                warn!(index = %index.id, error = %e, "skipping undecodable subquery document");
                continue;
            }
        };
        if subquery.bool.evaluate(&doc, &child).matched
            && let Some(value) = resolve_str(&doc, result_field)
        {
            values.insert(value);
        }
    }
    documents.close()?;

    debug!(index = %index.id, values = values.len(), "subquery finished");
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticLoader;
    use crate::query::Evaluation;
    use crate::query::test_support::{Fixture, case, doc};
    use serde_json::json;

    fn loader() -> StaticLoader {
        StaticLoader::new()
            .with_index(
                "orders",
                vec![
                    json!({"id": "o1", "user": "u1", "total": 120}),
                    json!({"id": "o2", "user": "u2", "total": 15}),
                    json!("corrupt"),
                    json!({"id": "o3", "user": 3, "total": 300}),
                ],
            )
            .with_index("vip", vec![json!({"name": "u1"})])
    }

    fn big_spenders(operation: u64) -> crate::query::Case {
        case(json!({"term": {
            "field": "id",
            "modifiers": {"operation": operation},
            "subQuery": {
                "index": "orders",
                "resultField": "user",
                "bool": {"all": [{"range": {"field": "total", "from": 100}}]}
            }
        }}))
    }

    #[test]
    fn test_collects_result_field() {
        let fixture = Fixture::with_loader(loader());
        let query: Query = serde_json::from_value(json!({
            "index": "orders",
            "resultField": "user",
            "bool": {"all": [{"range": {"field": "total", "from": 100}}]}
        }))
        .unwrap();

        let values = execute_subquery(&query, &fixture.ctx()).unwrap();
        let mut values: Vec<_> = values.into_iter().collect();
        values.sort();
        assert_eq!(values, vec!["3", "u1"]);
        assert_eq!(fixture.loader.requests()[0].index, "orders");
    }

    #[test]
    fn test_in_and_not_in() {
        let fixture = Fixture::with_loader(loader());
        let ctx = fixture.ctx();

        let u1 = doc(json!({"id": "u1"}));
        let u2 = doc(json!({"id": "u2"}));
        assert_eq!(big_spenders(9).evaluate(&u1, &ctx), Evaluation::from_bool(true));
        assert!(!big_spenders(9).evaluate(&u2, &ctx).matched);
        assert!(big_spenders(10).evaluate(&u2, &ctx).matched);

        // subquery attached to a non-membership operation
        assert!(!big_spenders(0).evaluate(&u1, &ctx).matched);
    }

    #[test]
    fn test_loader_error_is_non_match() {
        let fixture = Fixture::with_loader(StaticLoader::new());
        let in_case = big_spenders(9);
        let not_in = big_spenders(10);
        let u1 = doc(json!({"id": "u1"}));
        assert!(!in_case.evaluate(&u1, &fixture.ctx()).matched);
        assert!(!not_in.evaluate(&u1, &fixture.ctx()).matched);
    }

    #[test]
    fn test_requires_result_field() {
        let fixture = Fixture::with_loader(loader());
        let query: Query = serde_json::from_value(json!({"index": "orders"})).unwrap();
        let err = execute_subquery(&query, &fixture.ctx()).unwrap_err();
        assert!(matches!(err, HalberdError::Query(_)));
    }

    #[test]
    fn test_nested_subqueries_and_depth_limit() {
        let mut fixture = Fixture::with_loader(loader());
        let nested = case(json!({"term": {
            "field": "id",
            "modifiers": {"operation": 9},
            "subQuery": {
                "index": "orders",
                "resultField": "user",
                "bool": {"all": [{"term": {
                    "field": "user",
                    "modifiers": {"operation": 9},
                    "subQuery": {"index": "vip", "resultField": "name"}
                }}]}
            }
        }}));
        let u1 = doc(json!({"id": "u1"}));
        assert!(nested.evaluate(&u1, &fixture.ctx()).matched);

        fixture.config.max_subquery_depth = 1;
        assert!(!nested.evaluate(&u1, &fixture.ctx()).matched);
    }
}
