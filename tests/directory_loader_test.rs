//! Searching a filesystem-backed repository.

use std::fs;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use halberd::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn repository() -> (TempDir, IndexConfig) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("acme/config/index")).unwrap();
    fs::write(
        root.join("acme/config/index/products.json"),
        json!({"fields": ["region", "year"], "repoName": "catalog"}).to_string(),
    )
    .unwrap();
    fs::write(
        root.join("acme/config/index/broken.json"),
        json!({"fields": ["region"]}).to_string(),
    )
    .unwrap();

    let eu = root.join("acme/catalog/eu:2024");
    fs::create_dir_all(&eu).unwrap();
    fs::write(eu.join("1.json"), json!({"sku": "a1", "price": 12}).to_string()).unwrap();
    fs::write(eu.join("2.json"), json!({"sku": "a2", "price": 30}).to_string()).unwrap();
    let encoded = STANDARD.encode(json!({"sku": "a3", "price": 7}).to_string());
    fs::write(eu.join(format!("{encoded}.json")), "").unwrap();
    fs::write(eu.join("zz.json"), "{broken").unwrap();

    let us = root.join("acme/catalog/us:2024");
    fs::create_dir_all(&us).unwrap();
    fs::write(us.join("1.json"), json!({"sku": "b1", "price": 99}).to_string()).unwrap();

    let index = IndexConfig {
        owner: "acme".into(),
        repo: "acme/config".into(),
        branch: "main".into(),
        ..IndexConfig::default()
    };
    (dir, index)
}

fn skus(response: &SearchResponse) -> Vec<String> {
    response
        .documents()
        .unwrap()
        .iter()
        .map(|d| d["sku"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn searches_composite_directory() {
    let (dir, index) = repository();
    let engine = SearchEngine::new(Arc::new(DirectoryLoader::new(dir.path())), EngineConfig::default()).unwrap();

    let request = SearchRequest::from_json(
        br#"{"query": {
            "index": "products",
            "composite": {"region": "eu", "year": 2024},
            "bool": {"all": [{"range": {"field": "price", "from": 10}}]},
            "sort": [{"field": "price", "order": "desc"}]
        }}"#,
    )
    .unwrap();
    let response = engine
        .execute(&request, &index, &CancellationToken::new())
        .unwrap();
    assert_eq!(skus(&response), vec!["a2", "a1"]);
}

#[test]
fn union_over_regions() {
    let (dir, index) = repository();
    let engine = SearchEngine::new(Arc::new(DirectoryLoader::new(dir.path())), EngineConfig::default()).unwrap();

    let request = SearchRequest::from_json(
        br#"{"union": {"queries": [
            {"index": "products", "composite": {"region": "us", "year": 2024}},
            {"index": "products", "composite": {"region": "eu", "year": 2024}}
        ]}}"#,
    )
    .unwrap();
    let response = engine
        .execute(&request, &index, &CancellationToken::new())
        .unwrap();
    assert_eq!(skus(&response), vec!["b1", "a1", "a2", "a3"]);
}

#[test]
fn missing_composite_and_broken_definition_fail() {
    let (dir, index) = repository();
    let engine = SearchEngine::new(Arc::new(DirectoryLoader::new(dir.path())), EngineConfig::default()).unwrap();
    let cancel = CancellationToken::new();

    let payload = engine.handle(br#"{"query": {"index": "products"}}"#, &index, &cancel);
    assert_eq!(payload.status_code, 500);
    assert!(payload.error_message.contains("Composite"));

    let payload = engine.handle(
        br#"{"query": {"index": "broken", "composite": {"region": "eu"}}}"#,
        &index,
        &cancel,
    );
    assert_eq!(payload.status_code, 500);
}

#[test]
fn unknown_index_is_skipped() {
    let (dir, index) = repository();
    let engine = SearchEngine::new(Arc::new(DirectoryLoader::new(dir.path())), EngineConfig::default()).unwrap();

    let payload = engine.handle(
        br#"{"query": {"index": "ghosts", "composite": {"region": "eu"}}}"#,
        &index,
        &CancellationToken::new(),
    );
    assert_eq!(payload.status_code, 200);
    assert_eq!(payload.body_data, json!([]));
}
