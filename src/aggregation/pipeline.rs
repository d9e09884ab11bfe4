//! Pipelines over already computed buckets.
//!
//! Sibling pipelines (`pipelineAggs` on a node) and top-level pipelines
//! (request-level `aggs` entries of type `stats_bucket`) only read the
//! bucket tree; they never see documents.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use super::bucket::Bucket;
use super::metrics::{max, mean, min, population_std_dev, sum};
use super::request::PipelineRequest;

/// Separator of pipeline path segments.
pub const PATH_SEPARATOR: char = '>';

const STATS_BUCKET: &str = "stats_bucket";

/// Summary statistics over one metric of sibling buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub avg: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl BucketStats {
    /// Statistics of `values`, or `None` when there are none.
    pub fn from_values(values: &[f64]) -> Option<BucketStats> {
        if values.is_empty() {
            return None;
        }
        Some(BucketStats {
            count: values.len(),
            min: min(values),
            max: max(values),
            sum: sum(values),
            avg: mean(values),
            std_dev: population_std_dev(values),
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "count": self.count,
            "min": self.min,
            "max": self.max,
            "sum": self.sum,
            "avg": self.avg,
            "std_dev": self.std_dev,
        })
    }
}

/// `stats_bucket` over the buckets of one node.
///
/// The path must be exactly `agg>metric`; the metric is read from every
/// bucket that has a numeric value for it.
pub fn stats_bucket(buckets: &[Bucket], path: &str) -> Option<Value> {
    let parts: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let [_, metric] = parts.as_slice() else {
        error!(path, "stats_bucket path must be AGG_NAME>METRIC_NAME");
        return None;
    };

    let values: Vec<f64> = buckets
        .iter()
        .filter_map(|bucket| bucket.metric_f64(metric))
        .collect();
    BucketStats::from_values(&values).map(|stats| stats.to_value())
}

/// Run a node's sibling pipelines. Pipelines without a result are left out.
pub fn execute_pipelines(
    buckets: &[Bucket],
    pipelines: &BTreeMap<String, PipelineRequest>,
) -> BTreeMap<String, Value> {
    let mut results = BTreeMap::new();
    for (name, request) in pipelines {
        if !request.kind.eq_ignore_ascii_case(STATS_BUCKET) {
            warn!(pipeline = %name, kind = %request.kind, "unsupported pipeline aggregation");
            continue;
        }
        if let Some(result) = stats_bucket(buckets, &request.path) {
            results.insert(name.clone(), result);
        }
    }
    results
}

/// Find `metric` in `bucket` after descending through sub-buckets keyed by
/// the segments of `path`.
fn find_metric(bucket: &Bucket, path: &[&str], metric: &str) -> Option<f64> {
    let mut current = bucket;
    for key in path {
        current = current.sub_bucket(key)?;
    }
    current.metric_f64(metric)
}

/// A request-level pipeline over the buckets of another aggregation.
///
/// `inner_path` is the pipeline path after the target aggregation's name:
/// sub-bucket keys followed by the metric name.
pub fn top_level_pipeline(target: &[Bucket], kind: &str, inner_path: &[&str]) -> Option<Value> {
    let Some((metric, path)) = inner_path.split_last() else {
        error!(kind, "pipeline aggregation requires a metric path");
        return None;
    };

    if !kind.eq_ignore_ascii_case(STATS_BUCKET) {
        warn!(kind, "unsupported top-level pipeline aggregation");
        return None;
    }

    let values: Vec<f64> = target
        .iter()
        .filter_map(|bucket| find_metric(bucket, path, metric))
        .collect();

    Some(match BucketStats::from_values(&values) {
        Some(stats) => stats.to_value(),
        None => json!({"count": 0, "avg": 0.0, "min": null, "max": null, "sum": 0.0}),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(key: &str, metric: Option<f64>) -> Bucket {
        let mut bucket = Bucket::new(key, 1);
        if let Some(value) = metric {
            bucket.metrics.insert("sum_v".into(), Value::from(value));
        }
        bucket
    }

    #[test]
    fn test_stats_bucket() {
        let buckets = vec![bucket("a", Some(4.0)), bucket("b", Some(10.0)), bucket("c", None)];
        assert_eq!(
            stats_bucket(&buckets, "self>sum_v"),
            Some(json!({"count": 2, "min": 4.0, "max": 10.0, "sum": 14.0, "avg": 7.0, "std_dev": 3.0}))
        );
        assert_eq!(stats_bucket(&buckets, "sum_v"), None);
        assert_eq!(stats_bucket(&buckets, "a>b>sum_v"), None);
        assert_eq!(stats_bucket(&buckets, "self>absent"), None);
    }

    #[test]
    fn test_execute_pipelines_skips_unsupported() {
        let buckets = vec![bucket("a", Some(4.0))];
        let pipelines: BTreeMap<String, PipelineRequest> = [
            ("stats".to_string(), PipelineRequest { kind: "STATS_BUCKET".into(), path: "x>sum_v".into() }),
            ("avg".to_string(), PipelineRequest { kind: "avg_bucket".into(), path: "x>sum_v".into() }),
        ]
        .into_iter()
        .collect();
        let results = execute_pipelines(&buckets, &pipelines);
        assert_eq!(results.len(), 1);
        assert_eq!(results["stats"]["count"], json!(1));
    }

    #[test]
    fn test_top_level_walks_sub_buckets() {
        let mut parent = Bucket::new("reviews", 3);
        parent.buckets.push(bucket("inner", Some(6.0)));
        let mut other = Bucket::new("reviews", 1);
        other.buckets.push(bucket("inner", Some(2.0)));

        let result = top_level_pipeline(&[parent, other], "stats_bucket", &["inner", "sum_v"]).unwrap();
        assert_eq!(result["sum"], json!(8.0));
        assert_eq!(result["std_dev"], json!(2.0));

        let empty = top_level_pipeline(&[bucket("a", None)], "stats_bucket", &["sum_v"]).unwrap();
        assert_eq!(empty, json!({"count": 0, "avg": 0.0, "min": null, "max": null, "sum": 0.0}));

        assert!(top_level_pipeline(&[], "stats_bucket", &[]).is_none());
        assert!(top_level_pipeline(&[], "bucket_script", &["x"]).is_none());
    }
}
