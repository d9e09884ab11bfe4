//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::{AggregationResult, Bucket};
use crate::cli::args::{HalberdArgs, OutputFormat};
use crate::document::{SCORE_FIELD, format_f64, score_of};
use crate::error::Result;
use crate::search::SearchResultPayload;

/// Result structure for request validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    pub queries: usize,
    pub union: bool,
    pub templates_compiled: usize,
}

/// Result structure for text analysis.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mode: String,
    pub tokens: Vec<String>,
}

/// Search payload with timing.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    #[serde(flatten)]
    pub payload: SearchResultPayload,
    #[serde(skip)]
    pub duration_ms: u64,
}

/// Something the CLI can print in both formats.
pub trait Render: Serialize {
    /// Human-readable rendering.
    fn render_human(&self, out: &mut String);
}

impl Render for ValidationResult {
    fn render_human(&self, out: &mut String) {
        let kind = if self.union { "union" } else { "single query" };
        let _ = writeln!(out, "Request is valid ({kind})");
        let _ = writeln!(out, "  queries:   {}", self.queries);
        let _ = writeln!(out, "  templates: {}", self.templates_compiled);
    }
}

impl Render for AnalysisResult {
    fn render_human(&self, out: &mut String) {
        let _ = writeln!(out, "Tokens ({} mode):", self.mode);
        for (i, token) in self.tokens.iter().enumerate() {
            let _ = writeln!(out, "  {i:>3}  {token}");
        }
    }
}

impl Render for SearchOutput {
    fn render_human(&self, out: &mut String) {
        let payload = &self.payload;
        if !payload.is_success() {
            let _ = writeln!(out, "Search failed ({})", payload.status_code);
            let _ = writeln!(out, "  {}", payload.error_message);
            return;
        }

        if payload.is_aggregation {
            match serde_json::from_value::<AggregationResult>(payload.body_data.clone()) {
                Ok(result) => render_aggregation(&result, out),
                Err(_) => {
                    let _ = writeln!(out, "{}", format_value(&payload.body_data));
                }
            }
        } else {
            render_documents(&payload.body_data, out);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Completed in {} ms", self.duration_ms);
    }
}

fn render_documents(body: &Value, out: &mut String) {
    let docs = body.as_array().map(Vec::as_slice).unwrap_or_default();
    let _ = writeln!(out, "Search Results: {} document(s)", docs.len());
    let _ = writeln!(out, "═══════════════");

    for (i, doc) in docs.iter().enumerate() {
        let Some(doc) = doc.as_object() else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "Result {}: (Score: {:.3})", i + 1, score_of(doc));
        for (key, value) in doc {
            if key == SCORE_FIELD {
                continue;
            }
            let _ = writeln!(out, "  {key}: {}", format_value(value));
        }
    }
}

fn render_aggregation(result: &AggregationResult, out: &mut String) {
    let _ = writeln!(
        out,
        "Aggregation '{}': {} bucket(s), {} document(s)",
        result.name,
        result.buckets.len(),
        result.total_count()
    );
    for bucket in &result.buckets {
        render_bucket(bucket, 1, out);
    }
    for (name, value) in &result.pipeline_metrics {
        let _ = writeln!(out, "  {name}: {}", format_value(value));
    }
}

fn render_bucket(bucket: &Bucket, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let key = if bucket.key.is_empty() { "(all)" } else { bucket.key.as_str() };
    let _ = writeln!(out, "{indent}{key} ({})", bucket.count);
    for (name, value) in &bucket.metrics {
        let _ = writeln!(out, "{indent}  {name} = {}", format_value(value));
    }
    if !bucket.top_hits.is_empty() {
        let _ = writeln!(out, "{indent}  top hits: {}", bucket.top_hits.len());
    }
    for child in &bucket.buckets {
        render_bucket(child, depth + 1, out);
    }
    for (name, sub) in &bucket.aggs {
        let _ = writeln!(out, "{indent}  [{name}]");
        for child in &sub.buckets {
            render_bucket(child, depth + 2, out);
        }
    }
}

/// Format a JSON value for human output.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_f64).unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Render a result in the requested format.
pub fn render_result<T: Render>(result: &T, args: &HalberdArgs) -> Result<String> {
    match args.output_format {
        OutputFormat::Human => {
            let mut out = String::new();
            result.render_human(&mut out);
            Ok(out)
        }
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            Ok(json + "\n")
        }
    }
}

/// Print a result in the requested format.
pub fn output_result<T: Render>(result: &T, args: &HalberdArgs) -> Result<()> {
    print!("{}", render_result(result, args)?);
    Ok(())
}
