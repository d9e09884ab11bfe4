//! Aggregation trees computed over query matches.

use std::sync::Arc;

use halberd::prelude::*;
use serde_json::{Value, json};

fn listings() -> StaticLoader {
    StaticLoader::new().with_shared(vec![
        json!({"_id": "l1", "city": "Oslo", "title": "red house", "price": 300, "listed": "2024-01-10",
               "rooms": [{"kind": "bed", "size": 12}, {"kind": "bath", "size": 5}]}),
        json!({"_id": "l2", "city": "Oslo", "title": "red red cabin", "price": 120, "listed": "2024-01-28",
               "rooms": [{"kind": "bed", "size": 9}]}),
        json!({"_id": "l3", "city": "Bergen", "title": "blue house", "price": 250, "listed": "2024-02-02",
               "rooms": [{"kind": "bed", "size": 14}, {"kind": "bed", "size": 10}]}),
        json!({"_id": "l4", "city": "Bergen", "title": "red flat", "price": 90, "listed": "2024-03-15",
               "rooms": []}),
        json!({"_id": "l5", "title": "red barn", "price": 40, "listed": "2024-03-01"}),
    ])
}

fn aggregate(query: Value) -> AggregationResult {
    let engine = SearchEngine::new(Arc::new(listings()), EngineConfig::default()).unwrap();
    let request = SearchRequest::from_json(json!({"query": query}).to_string().as_bytes()).unwrap();
    let response = engine
        .execute(&request, &IndexConfig::default(), &CancellationToken::new())
        .unwrap();
    assert!(response.is_aggregation());
    response.aggregation().unwrap().clone()
}

#[test]
fn aggregates_only_matching_documents() {
    let result = aggregate(json!({
        "index": "listings",
        "bool": {"all": [{"match": {"field": "title", "value": "red"}}]},
        "aggs": {"cities": {
            "groupBy": ["city"],
            "metrics": [
                {"type": "avg", "fields": {"price": "avg_price"}},
                {"type": "cardinality", "fields": {"_id": "listings"}}
            ],
            "topHits": {"size": 1, "sort": [{"field": "price", "order": "asc"}], "source": ["_id"]}
        }}
    }));

    assert_eq!(result.name, "cities");
    let oslo = result.bucket("Oslo").unwrap();
    assert_eq!(oslo.count, 2);
    assert_eq!(oslo.metric_f64("avg_price"), Some(210.0));
    assert_eq!(oslo.metric_f64("listings"), Some(2.0));
    assert_eq!(oslo.top_hits[0]["_id"], json!("l2"));

    let bergen = result.bucket("Bergen").unwrap();
    assert_eq!(bergen.count, 1);
    assert_eq!(result.total_count(), 3, "l5 has no city");
}

#[test]
fn range_buckets_with_sub_aggregation() {
    let result = aggregate(json!({
        "index": "listings",
        "aggs": {"price_bands": {
            "rangeBuckets": {"price": [
                {"key": "budget", "to": 100},
                {"key": "mid", "from": 100, "to": 260},
                {"key": "premium", "from": 260}
            ]},
            "aggs": {"by_city": {"groupBy": ["city"]}}
        }}
    }));

    let counts: Vec<(&str, usize)> = result.buckets.iter().map(|b| (b.key.as_str(), b.count)).collect();
    assert_eq!(counts, vec![("budget", 2), ("mid", 2), ("premium", 1)]);

    let mid = result.bucket("mid").unwrap();
    let by_city = &mid.aggs["by_city"];
    assert_eq!(by_city.bucket("Oslo").map(|b| b.count), Some(1));
    assert_eq!(by_city.bucket("Bergen").map(|b| b.count), Some(1));
}

#[test]
fn date_histogram_with_top_level_pipeline() {
    let result = aggregate(json!({
        "index": "listings",
        "aggs": {
            "monthly": {
                "dateHistogram": {"field": "listed", "interval": "month"},
                "metrics": [{"type": "sum", "fields": {"price": "volume"}}]
            },
            "volume_stats": {"type": "stats_bucket", "path": "monthly>volume"}
        }
    }));

    let keys: Vec<&str> = result.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03"]);

    let stats = &result.pipeline_metrics["volume_stats"];
    assert_eq!(stats["count"], json!(3));
    assert_eq!(stats["sum"].as_f64(), Some(800.0));
    assert_eq!(stats["min"].as_f64(), Some(130.0));
    assert_eq!(stats["max"].as_f64(), Some(420.0));
}

#[test]
fn top_level_pipeline_without_values() {
    let result = aggregate(json!({
        "index": "listings",
        "aggs": {
            "cities": {"groupBy": ["city"]},
            "missing_metric": {"type": "stats_bucket", "path": "cities>avg_price"}
        }
    }));

    assert_eq!(
        result.pipeline_metrics["missing_metric"],
        json!({"count": 0, "avg": 0.0, "min": null, "max": null, "sum": 0.0})
    );
}

#[test]
fn conflicting_axes_fail_the_request() {
    let engine = SearchEngine::new(Arc::new(listings()), EngineConfig::default()).unwrap();
    let body = json!({"query": {
        "index": "listings",
        "aggs": {"cities": {
            "groupBy": ["city"],
            "dateHistogram": {"field": "listed", "interval": "month"},
            "pipelineAggs": {"p": {"type": "stats_bucket", "path": "cities>sub>price"}}
        }}
    }});

    let payload = engine.handle(
        body.to_string().as_bytes(),
        &IndexConfig::default(),
        &CancellationToken::new(),
    );
    assert_eq!(payload.status_code, 400);
    assert!(payload.error_message.contains("cities"), "{}", payload.error_message);
}

#[test]
fn malformed_sibling_pipeline_path_fails_the_request() {
    let engine = SearchEngine::new(Arc::new(listings()), EngineConfig::default()).unwrap();
    let body = json!({"query": {
        "index": "listings",
        "aggs": {"cities": {
            "groupBy": ["city"],
            "metrics": [{"type": "sum", "fields": {"price": "total"}}],
            "pipelineAggs": {"p": {"type": "stats_bucket", "path": "total"}}
        }}
    }});

    let payload = engine.handle(
        body.to_string().as_bytes(),
        &IndexConfig::default(),
        &CancellationToken::new(),
    );
    assert_eq!(payload.status_code, 400);
}

#[test]
fn nested_rooms_aggregation() {
    let result = aggregate(json!({
        "index": "listings",
        "aggs": {"rooms": {
            "path": "rooms",
            "aggs": {"by_kind": {
                "groupBy": ["kind"],
                "metrics": [{"type": "max", "fields": {"size": "largest"}}]
            }}
        }}
    }));

    assert_eq!(result.buckets.len(), 1);
    let outer = &result.buckets[0];
    assert_eq!(outer.key, "by_kind");
    assert_eq!(outer.count, 5);
    let bed = outer.sub_bucket("bed").unwrap();
    assert_eq!(bed.count, 4);
    assert_eq!(bed.metric_f64("largest"), Some(14.0));
    assert_eq!(outer.sub_bucket("bath").map(|b| b.count), Some(1));
}

#[test]
fn scripted_and_rollup_metrics() {
    let result = aggregate(json!({
        "index": "listings",
        "aggs": {"cities": {
            "groupBy": ["city"],
            "metrics": [
                {"type": "sum", "path": "rooms", "fields": {"size": "floor_area"}},
                {"type": "scripted", "scripted": {
                    "name": "price_k", "script": "{{ div .price 10 }}", "reduceType": "sum"
                }},
                {"type": "percentile", "percentile": 50, "fields": {"price": "p50"}}
            ]
        }}
    }));

    let oslo = result.bucket("Oslo").unwrap();
    assert_eq!(oslo.metric_f64("floor_area"), Some(26.0));
    assert_eq!(oslo.metric_f64("price_k"), Some(42.0));
    assert_eq!(oslo.metric_f64("p50"), Some(210.0));

    let bergen = result.bucket("Bergen").unwrap();
    assert_eq!(bergen.metric_f64("floor_area"), Some(24.0));
}

#[test]
fn score_modifiers_feed_top_hits() {
    let result = aggregate(json!({
        "index": "listings",
        "bool": {"all": [{"exists": {"field": "city"}}]},
        "scoreModifiers": {
            "combine": "replace",
            "functions": [{"type": "script", "code": "{{ .price }}"}]
        },
        "aggs": {"cities": {
            "groupBy": ["city"],
            "topHits": {"size": 1, "sort": [{"field": "_score", "order": "desc"}], "source": ["_id"]}
        }}
    }));

    assert_eq!(result.bucket("Oslo").unwrap().top_hits[0]["_id"], json!("l1"));
    assert_eq!(result.bucket("Bergen").unwrap().top_hits[0]["_id"], json!("l3"));
}
