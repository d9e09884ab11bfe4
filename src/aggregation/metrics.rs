//! Per-bucket metric computations.
//!
//! Numeric metrics read the scalar string form of a field and parse it as a
//! float; values that do not parse are logged and left out.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use tracing::{debug, warn};

use super::request::{MetricKind, MetricRequest, ScriptedMetric};
use crate::document::{Document, parse_f64, resolve_raw, resolve_str, scalar_to_string};
use crate::error::Result;
use crate::template::TemplateCache;

/// Result name of a scripted metric without a name.
pub const DEFAULT_SCRIPTED_NAME: &str = "scriptMetric";

/// Rank used when a percentile request is outside `(0, 100]`.
pub const DEFAULT_PERCENTILE: f64 = 50.0;

/// Numeric values of `field` across `docs`.
pub fn numeric_values(docs: &[&Document], field: &str) -> Vec<f64> {
    docs.iter()
        .filter_map(|doc| {
            let text = resolve_str(doc, field)?;
            let parsed = parse_f64(&text);
            if parsed.is_none() {
                warn!(field, value = %text, "metric value is not numeric");
            }
            parsed
        })
        .collect()
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, 0 for no values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        sum(values) / values.len() as f64
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median, averaging the middle pair of an even count. 0 for no values.
pub fn median(values: &[f64]) -> f64 {
    let sorted = sorted(values);
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Smallest value, 0 for no values.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

/// Largest value, 0 for no values.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

fn squared_deviations(values: &[f64]) -> f64 {
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum()
}

/// Sample standard deviation (`n - 1`), 0 for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    (squared_deviations(values) / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation (`n`), 0 for no values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (squared_deviations(values) / values.len() as f64).sqrt()
}

/// Percentile by linear interpolation at rank `(n - 1) * p / 100`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let sorted = sorted(values);
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }

    let rank = (n - 1) as f64 * (p / 100.0);
    if rank <= 0.0 {
        return sorted[0];
    }
    let index = rank.floor() as usize;
    if index >= n - 1 {
        return sorted[n - 1];
    }
    let fraction = rank - index as f64;
    sorted[index] + fraction * (sorted[index + 1] - sorted[index])
}

/// Most frequent string value of `field`; ties go to the smallest value.
/// Empty when no document has the field.
pub fn mode(docs: &[&Document], field: &str) -> String {
    let mut counts: AHashMap<String, usize> = AHashMap::new();
    for doc in docs {
        if let Some(value) = resolve_str(doc, field) {
            *counts.entry(value).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then_with(|| b.cmp(a)))
        .map(|(value, _)| value)
        .unwrap_or_default()
}

/// Distinct values of `field`. Array fields contribute each element.
pub fn cardinality(docs: &[&Document], field: &str) -> usize {
    let mut unique: AHashSet<String> = AHashSet::new();
    let mut add = |item: &Value| {
        unique.insert(scalar_to_string(item).unwrap_or_else(|| item.to_string()));
    };

    for doc in docs {
        match resolve_raw(doc, field) {
            Some(Value::Array(items)) => items.iter().for_each(&mut add),
            Some(value) => add(value),
            None => {}
        }
    }
    unique.len()
}

/// Compute the standard and scripted metrics of one bucket.
///
/// Each `fields` entry maps a source field to the result name it is stored
/// under. Unknown metric kinds are logged and skipped.
pub fn calculate_metrics(
    docs: &[&Document],
    requests: &[&MetricRequest],
    templates: &TemplateCache,
) -> BTreeMap<String, Value> {
    let mut results = BTreeMap::new();
    if docs.is_empty() {
        return results;
    }

    for request in requests {
        if let Some(scripted) = &request.scripted {
            let name = if scripted.name.is_empty() {
                DEFAULT_SCRIPTED_NAME.to_string()
            } else {
                scripted.name.clone()
            };
            let value = scripted_metric(docs, scripted, templates);
            results.insert(name, Value::from(value));
            continue;
        }

        let kind = request.metric_kind();
        for (source, result_name) in &request.fields {
            if result_name.is_empty() {
                continue;
            }

            let value = match kind {
                MetricKind::Sum => Value::from(sum(&numeric_values(docs, source))),
                MetricKind::Avg => Value::from(mean(&numeric_values(docs, source))),
                MetricKind::Median => Value::from(median(&numeric_values(docs, source))),
                MetricKind::Mode => Value::String(mode(docs, source)),
                MetricKind::Min => Value::from(min(&numeric_values(docs, source))),
                MetricKind::Max => Value::from(max(&numeric_values(docs, source))),
                MetricKind::StdDev => Value::from(sample_std_dev(&numeric_values(docs, source))),
                MetricKind::Percentile => {
                    let mut p = request.percentile;
                    if !(p > 0.0 && p <= 100.0) {
                        debug!(percentile = p, "percentile out of range, using the median");
                        p = DEFAULT_PERCENTILE;
                    }
                    Value::from(percentile(&numeric_values(docs, source), p))
                }
                MetricKind::Cardinality => Value::from(cardinality(docs, source) as f64),
                MetricKind::Count => Value::from(numeric_values(docs, source).len()),
                MetricKind::BucketScript | MetricKind::Unknown => {
                    warn!(kind = %request.kind, field = %source, "unknown metric type, skipping");
                    continue;
                }
            };
            results.insert(result_name.clone(), value);
        }
    }
    results
}

/// Render `scripted.script` per document and reduce the numbers.
///
/// Documents whose render fails are skipped; no successful render yields
/// the initial value.
pub fn scripted_metric(docs: &[&Document], scripted: &ScriptedMetric, templates: &TemplateCache) -> f64 {
    let template = match templates.get_or_compile(&scripted.script) {
        Ok(template) => template,
        Err(e) => {
            warn!(name = %scripted.name, error = %e, "scripted metric does not compile");
            return scripted.initial_value;
        }
    };

    let results: Vec<f64> = docs
        .iter()
        .filter_map(|doc| match template.render_number(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(name = %scripted.name, error = %e, "scripted metric failed for a document");
                None
            }
        })
        .collect();

    if results.is_empty() {
        return scripted.initial_value;
    }

    match scripted.reduce_type.to_ascii_lowercase().as_str() {
        "sum" => scripted.initial_value + sum(&results),
        "avg" => (scripted.initial_value + sum(&results)) / results.len() as f64,
        "min" => min(&results),
        "max" => max(&results),
        "count" => results.len() as f64,
        other => {
            warn!(name = %scripted.name, reduce = other, "unknown reduce type");
            scripted.initial_value
        }
    }
}

/// Roll up `source_field` of the objects in the array at `path`.
///
/// Supports `sum` and `avg`; no values yields 0. Other kinds are logged and
/// produce no metric.
pub fn nested_rollup(docs: &[&Document], kind: &str, path: &str, source_field: &str) -> Option<f64> {
    let values: Vec<f64> = docs
        .iter()
        .filter_map(|doc| resolve_raw(doc, path)?.as_array())
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|inner| resolve_str(inner, source_field))
        .filter_map(|text| parse_f64(&text))
        .collect();

    if values.is_empty() {
        return Some(0.0);
    }

    match MetricKind::parse(kind) {
        MetricKind::Sum => Some(sum(&values)),
        MetricKind::Avg => Some(mean(&values)),
        _ => {
            warn!(kind, path, "unsupported nested metric type");
            None
        }
    }
}

/// Evaluate a `bucket_script` over metrics already computed for a bucket.
///
/// Each `buckets_path` variable binds to a metric as a float; missing or
/// non-numeric metrics read as 0.
pub fn bucket_script(
    script: &str,
    buckets_path: &BTreeMap<String, String>,
    metrics: &BTreeMap<String, Value>,
    templates: &TemplateCache,
) -> Result<f64> {
    let mut context = Document::new();
    for (variable, metric) in buckets_path {
        let value = metrics.get(metric).and_then(Value::as_f64).unwrap_or(0.0);
        context.insert(variable.clone(), Value::from(value));
    }

    templates.get_or_compile(script)?.render_number(&context)
}
