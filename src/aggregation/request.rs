//! Aggregation request model.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::pipeline::PATH_SEPARATOR;
use crate::error::{HalberdError, Result};
use crate::query::SortField;

/// One aggregation node.
///
/// At most one bucketing axis is active per node: `path` (nested),
/// `groupBy`, `rangeBuckets`, or `dateHistogram`. [`Aggregation::validate`]
/// rejects nodes that set more than one. A node with none of them computes
/// its metrics over the whole input in one bucket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Aggregation {
    /// Node kind; `stats_bucket` and `bucket_script` mark top-level pipelines
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name
    pub name: String,
    /// Grouping fields; only the first one buckets
    pub group_by: Vec<String>,
    /// Date truncation axis
    pub date_histogram: Option<DateHistogram>,
    /// Representative documents per bucket
    pub top_hits: Option<TopHits>,
    /// Field to numeric ranges; only the first field buckets
    pub range_buckets: BTreeMap<String, Vec<RangeBucket>>,
    /// Per-bucket metrics
    pub metrics: Vec<MetricRequest>,
    /// Sub-aggregations run per bucket; inner aggregations of a nested node
    pub aggs: BTreeMap<String, Aggregation>,
    /// Array path to unnest, or the metric path of a top-level pipeline
    pub path: String,
    /// Sibling pipelines over this node's buckets
    pub pipeline_aggs: BTreeMap<String, PipelineRequest>,
}

/// The bucketing axis of an [`Aggregation`] node.
#[derive(Debug, Clone, Copy)]
pub enum Bucketing<'a> {
    /// Unnest the array at a path and run the inner aggregations
    Nested(&'a str),
    /// Group by the string form of a field
    Terms(&'a str),
    /// Route numeric values into declared ranges
    Range(&'a str, &'a [RangeBucket]),
    /// Truncate dates to an interval
    DateHistogram(&'a DateHistogram),
    /// One bucket over the whole input
    None,
}

impl Aggregation {
    /// The active bucketing axis.
    pub fn bucketing(&self) -> Bucketing<'_> {
        if !self.path.is_empty() {
            Bucketing::Nested(&self.path)
        } else if let Some(field) = self.group_by.first() {
            Bucketing::Terms(field)
        } else if let Some((field, ranges)) = self.range_buckets.iter().next() {
            Bucketing::Range(field, ranges)
        } else if let Some(histogram) = &self.date_histogram {
            Bucketing::DateHistogram(histogram)
        } else {
            Bucketing::None
        }
    }

    /// Check the shape of this node and its sub-aggregations.
    ///
    /// `top_level` allows the node to be a pipeline whose `path` names a
    /// metric of another aggregation instead of an array to unnest.
    pub fn validate(&self, name: &str, top_level: bool) -> Result<()> {
        if top_level && self.is_pipeline() {
            let segments: Vec<&str> = self.path.split(PATH_SEPARATOR).collect();
            if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
                return Err(HalberdError::query(format!(
                    "aggregation '{name}': pipeline path '{}' must be AGG_NAME>[KEY>...]METRIC_NAME",
                    self.path
                )));
            }
            return Ok(());
        }

        let axes = [
            !self.path.is_empty(),
            !self.group_by.is_empty(),
            !self.range_buckets.is_empty(),
            self.date_histogram.is_some(),
        ];
        if axes.iter().filter(|active| **active).count() > 1 {
            return Err(HalberdError::query(format!(
                "aggregation '{name}': only one of path, groupBy, rangeBuckets, dateHistogram may be set"
            )));
        }
        if self.range_buckets.len() > 1 {
            return Err(HalberdError::query(format!(
                "aggregation '{name}': rangeBuckets must name exactly one field"
            )));
        }

        for (pipeline, request) in &self.pipeline_aggs {
            let segments: Vec<&str> = request.path.split(PATH_SEPARATOR).collect();
            if segments.len() != 2 || segments.iter().any(|s| s.is_empty()) {
                return Err(HalberdError::query(format!(
                    "pipeline '{pipeline}' of aggregation '{name}': path '{}' must be AGG_NAME>METRIC_NAME",
                    request.path
                )));
            }
        }

        for (sub_name, sub) in &self.aggs {
            sub.validate(sub_name, false)?;
        }
        Ok(())
    }

    /// Whether the node computes anything when it has no bucketing axis.
    pub fn has_work(&self) -> bool {
        !self.metrics.is_empty()
            || !self.aggs.is_empty()
            || !self.pipeline_aggs.is_empty()
            || self.top_hits.as_ref().is_some_and(|hits| hits.size > 0)
    }

    /// Whether this top-level entry is a pipeline over another entry's buckets.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self.kind.to_ascii_lowercase().as_str(),
            "stats_bucket" | "bucket_script"
        )
    }
}

/// Date histogram axis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateHistogram {
    /// Date field
    pub field: String,
    /// `minute`, `hour`, `day`, `month`, or `year`
    pub interval: String,
}

/// Date histogram interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Interval {
    /// Parse an interval name, case-insensitively.
    pub fn parse(name: &str) -> Option<Interval> {
        match name.to_ascii_lowercase().as_str() {
            "minute" => Some(Interval::Minute),
            "hour" => Some(Interval::Hour),
            "day" => Some(Interval::Day),
            "month" => Some(Interval::Month),
            "year" => Some(Interval::Year),
            _ => None,
        }
    }

    /// `chrono` format of the bucket key; keys sort chronologically.
    pub fn key_format(&self) -> &'static str {
        match self {
            Interval::Minute => "%Y-%m-%dT%H:%M",
            Interval::Hour => "%Y-%m-%dT%H",
            Interval::Day => "%Y-%m-%d",
            Interval::Month => "%Y-%m",
            Interval::Year => "%Y",
        }
    }
}

/// Representative documents of a bucket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TopHits {
    /// Documents kept; zero disables top hits
    pub size: i64,
    /// Sort keys applied before truncation
    pub sort: Vec<SortField>,
    /// Projected fields
    pub source: Vec<String>,
}

/// One numeric range bucket, `[from, to)`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RangeBucket {
    /// Bucket key
    pub key: String,
    /// Inclusive lower bound; absent means unbounded
    pub from: Option<f64>,
    /// Exclusive upper bound; absent means unbounded
    pub to: Option<f64>,
}

impl RangeBucket {
    /// Whether `value` falls in this range.
    ///
    /// With `zero_is_open`, an upper bound of exactly 0 is unbounded.
    pub fn contains(&self, value: f64, zero_is_open: bool) -> bool {
        let above = self.from.is_none_or(|from| value >= from);
        let below = match self.to {
            None => true,
            Some(to) if zero_is_open && to == 0.0 => true,
            Some(to) => value < to,
        };
        above && below
    }
}

/// Sibling pipeline over the buckets of the same node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineRequest {
    /// Pipeline kind; `stats_bucket` is supported
    #[serde(rename = "type")]
    pub kind: String,
    /// `agg>metric`
    pub path: String,
}

/// A metric computed per bucket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricRequest {
    /// Metric kind, see [`MetricKind`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Rank for `percentile`, in `(0, 100]`
    pub percentile: f64,
    /// Array path for nested rollups
    pub path: String,
    /// Source field to result name
    pub fields: BTreeMap<String, String>,
    /// Map-reduce script, computed instead of `fields`
    pub scripted: Option<ScriptedMetric>,
    /// `bucket_script` template
    pub script: String,
    /// `bucket_script` variable to metric name
    pub buckets_path: Option<BTreeMap<String, String>>,
    /// `bucket_script` result name
    pub result_name: String,
}

impl MetricRequest {
    /// Parsed metric kind.
    pub fn metric_kind(&self) -> MetricKind {
        MetricKind::parse(&self.kind)
    }

    /// Whether this metric reads other metrics of its bucket.
    pub fn is_bucket_script(&self) -> bool {
        self.metric_kind() == MetricKind::BucketScript
    }

    /// Whether this metric rolls up an array nested in each document.
    pub fn is_nested_rollup(&self) -> bool {
        !self.path.is_empty()
    }
}

/// Metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Sum,
    /// `avg` or `mean`
    Avg,
    Median,
    /// Most frequent string value
    Mode,
    Min,
    Max,
    /// Sample standard deviation
    StdDev,
    Percentile,
    /// `cardinality` or `unique_count`
    Cardinality,
    /// Number of numeric values
    Count,
    BucketScript,
    Unknown,
}

impl MetricKind {
    /// Parse a kind name, case-insensitively.
    pub fn parse(name: &str) -> MetricKind {
        match name.to_ascii_lowercase().as_str() {
            "sum" => MetricKind::Sum,
            "avg" | "mean" => MetricKind::Avg,
            "median" => MetricKind::Median,
            "mode" => MetricKind::Mode,
            "min" => MetricKind::Min,
            "max" => MetricKind::Max,
            "std_dev" => MetricKind::StdDev,
            "percentile" => MetricKind::Percentile,
            "cardinality" | "unique_count" => MetricKind::Cardinality,
            "count" => MetricKind::Count,
            "bucket_script" => MetricKind::BucketScript,
            _ => MetricKind::Unknown,
        }
    }
}

/// Map-reduce metric: a template rendered per document, then reduced.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptedMetric {
    /// Result name, `scriptMetric` when empty
    pub name: String,
    /// Template rendering a number per document
    pub script: String,
    /// `sum`, `avg`, `min`, `max`, or `count`
    pub reduce_type: String,
    /// Reduction seed and empty-input result
    pub initial_value: f64,
}
