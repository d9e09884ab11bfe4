//! Recursive bucketing and the per-bucket passes.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::bucket::{AggregationResult, Bucket};
use super::metrics::{bucket_script, calculate_metrics, nested_rollup};
use super::pipeline::{PATH_SEPARATOR, execute_pipelines, top_level_pipeline};
use super::request::{Aggregation, Bucketing, DateHistogram, Interval, MetricRequest, RangeBucket};
use crate::config::EngineConfig;
use crate::document::{Document, ID_FIELD, SCORE_FIELD, parse_date, resolve_f64, resolve_raw, resolve_str};
use crate::search::controls::{apply_paging, apply_sort, project_fields};
use crate::template::TemplateCache;

/// Runs aggregation trees over matched documents.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    templates: &'a TemplateCache,
    range_zero_is_open: bool,
}

impl<'a> Aggregator<'a> {
    pub fn new(templates: &'a TemplateCache, range_zero_is_open: bool) -> Self {
        Aggregator {
            templates,
            range_zero_is_open,
        }
    }

    /// An aggregator with the range behavior of `config`.
    pub fn with_config(templates: &'a TemplateCache, config: &EngineConfig) -> Self {
        Self::new(templates, config.range_zero_is_open)
    }

    /// Run a request's `aggs` map.
    ///
    /// Entries of type `stats_bucket` or `bucket_script` are pipelines over
    /// another entry, addressed as `target>[sub-bucket>…]metric`. The
    /// response is the first primary aggregation by name with every
    /// pipeline result merged into its `pipelineMetrics`.
    pub fn execute_request(&self, docs: &[Document], aggs: &BTreeMap<String, Aggregation>) -> AggregationResult {
        let docs: Vec<&Document> = docs.iter().collect();
        let (pipelines, primaries): (Vec<_>, Vec<_>) =
            aggs.iter().partition(|(_, agg)| agg.is_pipeline());

        let results: BTreeMap<&str, AggregationResult> = primaries
            .iter()
            .map(|(name, agg)| {
                let mut result = self.execute(&docs, agg);
                if result.name.is_empty() {
                    result.name = name.to_string();
                }
                (name.as_str(), result)
            })
            .collect();

        let mut pipeline_metrics = BTreeMap::new();
        for (name, pipeline) in pipelines {
            if pipeline.path.is_empty() {
                continue;
            }
            let parts: Vec<&str> = pipeline.path.split(PATH_SEPARATOR).collect();
            let Some(target) = results.get(parts[0]) else {
                warn!(pipeline = %name, target = parts[0], "pipeline target aggregation not found");
                continue;
            };
            if let Some(value) = top_level_pipeline(&target.buckets, &pipeline.kind, &parts[1..]) {
                pipeline_metrics.insert(name.clone(), value);
            }
        }

        let mut response = primaries
            .first()
            .and_then(|(name, _)| results.get(name.as_str()).cloned())
            .unwrap_or_default();
        response.pipeline_metrics.extend(pipeline_metrics);
        response
    }

    /// Run one aggregation node over `docs`.
    pub fn execute(&self, docs: &[&Document], agg: &Aggregation) -> AggregationResult {
        let buckets = match agg.bucketing() {
            Bucketing::Nested(path) => self.nested(docs, agg, path),
            Bucketing::Terms(field) => self.terms(docs, agg, field),
            Bucketing::Range(field, ranges) => self.ranges(docs, agg, field, ranges),
            Bucketing::DateHistogram(histogram) => match self.date_histogram(docs, agg, histogram) {
                Some(buckets) => buckets,
                None => return AggregationResult::default(),
            },
            Bucketing::None if agg.has_work() => {
                debug!(docs = docs.len(), "no bucketing axis, computing over all documents");
                vec![self.process_group(agg, "", docs)]
            }
            Bucketing::None => {
                debug!("aggregation has neither an axis nor metrics");
                return AggregationResult::default();
            }
        };

        let pipeline_metrics = execute_pipelines(&buckets, &agg.pipeline_aggs);
        AggregationResult {
            name: agg.name.clone(),
            buckets,
            pipeline_metrics,
        }
    }

    /// Group by the string form of `field`; documents without it are
    /// skipped. Buckets are ordered by count, then key.
    fn terms(&self, docs: &[&Document], agg: &Aggregation, field: &str) -> Vec<Bucket> {
        debug!(field, "grouping by field");
        let mut groups: AHashMap<String, Vec<&Document>> = AHashMap::new();
        for doc in docs {
            if let Some(key) = resolve_str(doc, field) {
                groups.entry(key.trim().to_string()).or_default().push(*doc);
            }
        }

        let mut groups: Vec<(String, Vec<&Document>)> = groups.into_iter().collect();
        groups.sort_by(|(ka, da), (kb, db)| db.len().cmp(&da.len()).then_with(|| ka.cmp(kb)));
        groups
            .into_iter()
            .map(|(key, group)| self.process_group(agg, &key, &group))
            .collect()
    }

    /// Route each numeric value into the first range containing it. Every
    /// declared range gets a bucket, in declaration order.
    fn ranges(&self, docs: &[&Document], agg: &Aggregation, field: &str, ranges: &[RangeBucket]) -> Vec<Bucket> {
        debug!(field, ranges = ranges.len(), "grouping by range");
        let mut groups: Vec<Vec<&Document>> = vec![Vec::new(); ranges.len()];
        for doc in docs {
            let Some(value) = resolve_f64(doc, field) else {
                continue;
            };
            if let Some(index) = ranges
                .iter()
                .position(|range| range.contains(value, self.range_zero_is_open))
            {
                groups[index].push(*doc);
            }
        }

        ranges
            .iter()
            .zip(groups)
            .map(|(range, group)| self.process_group(agg, &range.key, &group))
            .collect()
    }

    /// Truncate parsed dates to the interval. Buckets are chronological.
    /// `None` for an unknown interval.
    fn date_histogram(&self, docs: &[&Document], agg: &Aggregation, histogram: &DateHistogram) -> Option<Vec<Bucket>> {
        let Some(interval) = Interval::parse(&histogram.interval) else {
            warn!(interval = %histogram.interval, "invalid date histogram interval");
            return None;
        };
        debug!(field = %histogram.field, ?interval, "grouping by date histogram");

        let mut groups: BTreeMap<String, Vec<&Document>> = BTreeMap::new();
        for doc in docs {
            let Some(date) = resolve_str(doc, &histogram.field).and_then(|text| parse_date(&text)) else {
                continue;
            };
            let key = date.format(interval.key_format()).to_string();
            groups.entry(key).or_default().push(*doc);
        }

        Some(
            groups
                .into_iter()
                .map(|(key, group)| self.process_group(agg, &key, &group))
                .collect(),
        )
    }

    /// Unnest the objects of the array at `path` and run every inner
    /// aggregation over them. Each inner aggregation becomes one bucket
    /// keyed by its name.
    fn nested(&self, docs: &[&Document], agg: &Aggregation, path: &str) -> Vec<Bucket> {
        if agg.aggs.is_empty() {
            error!(aggregation = %agg.name, path, "nested aggregation has no inner aggs");
            return Vec::new();
        }

        let unnested = unnest(docs, path);
        debug!(path, parents = docs.len(), unnested = unnested.len(), "unnested documents");
        if unnested.is_empty() {
            return Vec::new();
        }

        let unnested: Vec<&Document> = unnested.iter().collect();
        agg.aggs
            .iter()
            .map(|(name, inner)| {
                let result = self.execute(&unnested, inner);
                let mut bucket = Bucket::new(name.clone(), unnested.len());
                bucket.buckets = result.buckets;
                bucket.metrics = result.pipeline_metrics;
                bucket
            })
            .collect()
    }

    /// Compute one bucket: nested rollups and standard metrics, then
    /// `bucket_script` metrics, then top hits, then sub-aggregations.
    fn process_group(&self, agg: &Aggregation, key: &str, docs: &[&Document]) -> Bucket {
        let mut bucket = Bucket::new(key.trim(), docs.len());
        if docs.is_empty() {
            return bucket;
        }

        let (scripts, simple): (Vec<&MetricRequest>, Vec<&MetricRequest>) =
            agg.metrics.iter().partition(|request| request.is_bucket_script());
        let (rollups, standard): (Vec<&MetricRequest>, Vec<&MetricRequest>) =
            simple.into_iter().partition(|request| request.is_nested_rollup());

        for request in rollups {
            for (source, result_name) in &request.fields {
                if result_name.is_empty() {
                    continue;
                }
                if let Some(value) = nested_rollup(docs, &request.kind, &request.path, source) {
                    bucket.metrics.insert(result_name.clone(), Value::from(value));
                }
            }
        }
        if !standard.is_empty() {
            let results = calculate_metrics(docs, &standard, self.templates);
            bucket.metrics.extend(results);
        }

        for request in scripts {
            let Some(buckets_path) = request.buckets_path.as_ref().filter(|_| {
                !request.script.is_empty() && !request.result_name.is_empty()
            }) else {
                error!("bucket_script needs script, bucketsPath, and resultName");
                continue;
            };
            let value = bucket_script(&request.script, buckets_path, &bucket.metrics, self.templates)
                .unwrap_or_else(|e| {
                    error!(result = %request.result_name, error = %e, "bucket_script failed");
                    0.0
                });
            bucket.metrics.insert(request.result_name.clone(), Value::from(value));
        }

        if let Some(top_hits) = agg.top_hits.as_ref().filter(|hits| hits.size > 0) {
            let mut hits: Vec<Document> = docs.iter().map(|doc| (*doc).clone()).collect();
            apply_sort(&mut hits, &top_hits.sort);
            let hits = apply_paging(hits, top_hits.size, 0);
            bucket.top_hits = project_fields(hits, &top_hits.source);
        }

        for (name, sub) in &agg.aggs {
            bucket.aggs.insert(name.clone(), self.execute(docs, sub));
        }
        bucket
    }
}

/// Objects of the array at `path`, each carrying its parent's `_score` and
/// `_id` under its own fields.
fn unnest(docs: &[&Document], path: &str) -> Vec<Document> {
    let mut unnested = Vec::new();
    for doc in docs {
        let Some(items) = resolve_raw(doc, path).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            let Some(inner) = item.as_object() else {
                debug!(path, "skipping non-object array element");
                continue;
            };
            let mut merged = Document::new();
            for field in [SCORE_FIELD, ID_FIELD] {
                if let Some(value) = doc.get(field) {
                    merged.insert(field.to_string(), value.clone());
                }
            }
            merged.extend(inner.iter().map(|(k, v)| (k.clone(), v.clone())));
            unnested.push(merged);
        }
    }
    unnested
}
