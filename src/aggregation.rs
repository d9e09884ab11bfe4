//! Aggregations over matched documents.
//!
//! An [`Aggregation`] node buckets its input along at most one axis (nested
//! unnesting, terms, numeric ranges, or a date histogram) and then, per
//! bucket, computes metrics, `bucket_script` metrics, top hits, and
//! sub-aggregations. Sibling pipelines summarize a node's buckets and
//! top-level pipelines summarize another request-level aggregation.
//!
//! # Examples
//!
//! ```
//! use halberd::aggregation::{Aggregation, Aggregator};
//! use halberd::document::Document;
//! use halberd::template::TemplateCache;
//! use serde_json::json;
//!
//! let docs: Vec<Document> = [
//!     json!({"cat": "a", "v": 1}),
//!     json!({"cat": "a", "v": 3}),
//!     json!({"cat": "b", "v": 10}),
//! ]
//! .iter()
//! .map(|v| v.as_object().cloned().unwrap())
//! .collect();
//!
//! let agg: Aggregation = serde_json::from_value(json!({
//!     "groupBy": ["cat"],
//!     "metrics": [{"type": "sum", "fields": {"v": "sum_v"}}]
//! }))
//! .unwrap();
//!
//! let templates = TemplateCache::default();
//! let refs: Vec<&Document> = docs.iter().collect();
//! let result = Aggregator::new(&templates, true).execute(&refs, &agg);
//!
//! assert_eq!(result.buckets[0].key, "a");
//! assert_eq!(result.buckets[0].metric_f64("sum_v"), Some(4.0));
//! ```

pub mod bucket;
mod executor;
pub mod metrics;
pub mod pipeline;
pub mod request;

pub use bucket::{AggregationResult, Bucket};
pub use executor::Aggregator;
pub use pipeline::BucketStats;
pub use request::{
    Aggregation, Bucketing, DateHistogram, Interval, MetricKind, MetricRequest, PipelineRequest,
    RangeBucket, ScriptedMetric, TopHits,
};
