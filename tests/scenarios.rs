//! End-to-end request scenarios against an in-memory loader.

use std::sync::Arc;

use halberd::prelude::*;
use serde_json::{Value, json};

fn engine(loader: StaticLoader) -> SearchEngine {
    SearchEngine::new(Arc::new(loader), EngineConfig::default()).unwrap()
}

fn search(engine: &SearchEngine, body: Value) -> SearchResponse {
    let request = SearchRequest::from_json(body.to_string().as_bytes()).unwrap();
    engine
        .execute(&request, &IndexConfig::default(), &CancellationToken::new())
        .unwrap()
}

fn ids(response: &SearchResponse) -> Vec<i64> {
    response
        .documents()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_i64().unwrap())
        .collect()
}

fn score(doc: &Document) -> f64 {
    doc["_score"].as_f64().unwrap()
}

#[test]
fn boolean_match_relevance() {
    let engine = engine(StaticLoader::new().with_shared(vec![
        json!({"id": 1, "title": "red car fast"}),
        json!({"id": 2, "title": "blue car"}),
        json!({"id": 3, "title": "red bike"}),
    ]));

    let response = search(
        &engine,
        json!({"query": {"index": "vehicles", "bool": {"all": [
            {"match": {"field": "title", "value": "red car"}}
        ]}}}),
    );

    assert_eq!(ids(&response), vec![1, 2, 3]);
    let docs = response.documents().unwrap();
    assert!(score(&docs[0]) >= 2.0 * score(&docs[1]));
    assert_eq!(score(&docs[1]), score(&docs[2]));
}

#[test]
fn phrase_with_slop() {
    let engine = engine(StaticLoader::new().with_shared(vec![
        json!({"id": 2, "text": "quick red brown fox"}),
        json!({"id": 1, "text": "quick brown fox"}),
        json!({"id": 3, "text": "brown quick fox"}),
    ]));

    let response = search(
        &engine,
        json!({"query": {"index": "animals", "bool": {"all": [
            {"matchPhrase": {"field": "text", "value": "quick brown", "slop": 1}}
        ]}}}),
    );

    assert_eq!(ids(&response), vec![1, 2]);
}

#[test]
fn geo_radius() {
    let engine = engine(StaticLoader::new().with_shared(vec![
        json!({"id": 1, "loc": {"lat": 40.0, "lon": -74.0}}),
        json!({"id": 2, "loc": {"lat": 41.0, "lon": -74.0}}),
    ]));

    let response = search(
        &engine,
        json!({"query": {"index": "places", "bool": {"all": [
            {"geoDistance": {"field": "loc", "lat": 40.0, "lon": -74.0, "distance": 50, "unit": "km"}}
        ]}}}),
    );

    assert_eq!(ids(&response), vec![1]);
}

fn s4_docs() -> StaticLoader {
    StaticLoader::new().with_shared(vec![
        json!({"cat": "a", "v": 1}),
        json!({"cat": "a", "v": 3}),
        json!({"cat": "b", "v": 10}),
    ])
}

#[test]
fn terms_aggregation_with_sum() {
    let engine = engine(s4_docs());
    let response = search(
        &engine,
        json!({"query": {"index": "items", "aggs": {"by_cat": {
            "groupBy": ["cat"],
            "metrics": [{"type": "sum", "fields": {"v": "sum_v"}}]
        }}}}),
    );

    let result = response.aggregation().unwrap();
    let buckets: Vec<(&str, usize, Option<f64>)> = result
        .buckets
        .iter()
        .map(|b| (b.key.as_str(), b.count, b.metric_f64("sum_v")))
        .collect();
    assert_eq!(buckets, vec![("a", 2, Some(4.0)), ("b", 1, Some(10.0))]);
}

#[test]
fn stats_bucket_pipeline() {
    let engine = engine(s4_docs());
    let response = search(
        &engine,
        json!({"query": {"index": "items", "aggs": {"by_cat": {
            "groupBy": ["cat"],
            "metrics": [{"type": "sum", "fields": {"v": "sum_v"}}],
            "pipelineAggs": {"bucket_stats": {"type": "stats_bucket", "path": "self>sum_v"}}
        }}}}),
    );

    let stats = &response.aggregation().unwrap().pipeline_metrics["bucket_stats"];
    assert_eq!(stats["count"], json!(2));
    assert_eq!(stats["min"].as_f64(), Some(4.0));
    assert_eq!(stats["max"].as_f64(), Some(10.0));
    assert_eq!(stats["sum"].as_f64(), Some(14.0));
    assert_eq!(stats["avg"].as_f64(), Some(7.0));
    assert_eq!(stats["std_dev"].as_f64(), Some(3.0));
}

#[test]
fn union_applies_first_query_controls() {
    let loader = StaticLoader::new()
        .with_index("a", vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})])
        .with_index("b", vec![json!({"id": 4}), json!({"id": 5})]);
    let engine = engine(loader);

    let response = search(
        &engine,
        json!({"union": {"queries": [
            {"index": "a", "limit": 4},
            {"index": "b", "limit": 1, "offset": 1}
        ]}}),
    );

    assert_eq!(ids(&response), vec![1, 2, 3, 4]);
}

#[test]
fn payload_shape() {
    let engine = engine(s4_docs());
    let payload = engine.handle(
        br#"{"query": {"index": "items", "source": ["cat"], "limit": 1}}"#,
        &IndexConfig::default(),
        &CancellationToken::new(),
    );

    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["statusCode"], json!(200));
    assert_eq!(value["isAggregation"], json!(false));
    assert!(value.get("errorMessage").is_none());
    assert_eq!(value["bodyData"], json!([{"cat": "a", "_score": 0.0}]));
}
