//! Aggregation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// A group of documents sharing a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Group key
    pub key: String,
    /// Documents routed into the bucket
    pub count: usize,
    /// Metric name to value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, Value>,
    /// Representative documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_hits: Vec<Document>,
    /// Buckets of a nested aggregation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<Bucket>,
    /// Sub-aggregation results by name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, AggregationResult>,
}

impl Bucket {
    /// An empty bucket.
    pub fn new(key: impl Into<String>, count: usize) -> Self {
        Bucket {
            key: key.into(),
            count,
            ..Bucket::default()
        }
    }

    /// A metric as a float; integers widen.
    pub fn metric_f64(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(Value::as_f64)
    }

    /// Direct sub-bucket by key.
    pub fn sub_bucket(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.key == key)
    }
}

/// The buckets of one aggregation node plus its sibling pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Aggregation name
    #[serde(default)]
    pub name: String,
    /// Buckets, in axis order
    #[serde(default)]
    pub buckets: Vec<Bucket>,
    /// Pipeline name to result
    #[serde(default)]
    pub pipeline_metrics: BTreeMap<String, Value>,
}

impl AggregationResult {
    /// Bucket by key.
    pub fn bucket(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.key == key)
    }

    /// Total documents across buckets.
    pub fn total_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}
