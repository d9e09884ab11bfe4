//! Result controls: function scoring, sorting, projection, and paging.
//!
//! The orchestrator applies them in that order once all matches are in.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, SCORE_FIELD, parse_f64, resolve_str, score_of, set_score};
use crate::query::{CombineMode, FunctionScore, SortField, SortOrder};
use crate::template::TemplateCache;

/// Combine the functions of `function_score` into each document's `_score`.
///
/// Each function template renders a number that is multiplied by its
/// weight. A function that fails is logged and skipped.
///
/// - `multiply`: score times the product of the weighted results
/// - `sum`: score plus the sum of the weighted results
/// - `replace`: the last weighted result replaces the score
pub fn apply_score_modifiers(docs: &mut [Document], function_score: &FunctionScore, templates: &TemplateCache) {
    if function_score.functions.is_empty() {
        return;
    }

    for doc in docs.iter_mut() {
        let weighted: Vec<f64> = function_score
            .functions
            .iter()
            .filter_map(|function| {
                let rendered = templates
                    .get_or_compile(&function.code)
                    .and_then(|template| template.render_number(doc));
                match rendered {
                    Ok(value) => Some(value * function.weight.unwrap_or(1.0)),
                    Err(e) => {
                        warn!(kind = %function.kind, error = %e, "score function failed");
                        None
                    }
                }
            })
            .collect();

        let score = score_of(doc);
        let combined = match function_score.combine {
            CombineMode::Multiply => score * weighted.iter().product::<f64>(),
            CombineMode::Sum => score + weighted.iter().sum::<f64>(),
            CombineMode::Replace => weighted.last().copied().unwrap_or(score),
        };
        set_score(doc, combined);
    }
}

/// Sort key of one document for one field.
enum SortKey {
    Missing,
    Number(f64),
    Text(String),
}

fn sort_key(doc: &Document, field: &str) -> SortKey {
    if field == SCORE_FIELD {
        return match doc.get(SCORE_FIELD).and_then(Value::as_f64) {
            Some(score) => SortKey::Number(score),
            None => SortKey::Missing,
        };
    }
    match resolve_str(doc, field) {
        Some(text) => match parse_f64(&text) {
            Some(number) => SortKey::Number(number),
            None => SortKey::Text(text),
        },
        None => SortKey::Missing,
    }
}

/// Ascending order of two present keys: numbers before text, numbers
/// compared numerically and text by string.
fn compare_present(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Number(_), _) => Ordering::Less,
        (_, SortKey::Number(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_docs(a: &Document, b: &Document, fields: &[SortField]) -> Ordering {
    for field in fields {
        let ka = sort_key(a, &field.field);
        let kb = sort_key(b, &field.field);
        let ordering = match (&ka, &kb) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            // missing values go last ascending and first descending
            (SortKey::Missing, _) => Ordering::Greater,
            (_, SortKey::Missing) => Ordering::Less,
            _ => compare_present(&ka, &kb),
        };
        let ordering = match field.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable multi-key sort.
pub fn apply_sort(docs: &mut [Document], fields: &[SortField]) {
    if fields.is_empty() || docs.len() < 2 {
        return;
    }
    docs.sort_by(|a, b| compare_docs(a, b, fields));
}

/// Keep only the `source` fields of each document, plus `_score`.
///
/// Top-level fields keep their JSON value. Dotted paths are stored under
/// the full path as the resolved scalar's string form.
pub fn project_fields(docs: Vec<Document>, source: &[String]) -> Vec<Document> {
    if source.is_empty() {
        return docs;
    }
    debug!(fields = source.len(), docs = docs.len(), "projecting fields");

    docs.into_iter()
        .map(|doc| {
            let mut projected = Document::new();
            for field in source {
                if !field.contains('.')
                    && let Some(value) = doc.get(field)
                {
                    projected.insert(field.clone(), value.clone());
                } else if let Some(text) = resolve_str(&doc, field) {
                    projected.insert(field.clone(), Value::String(text));
                }
            }
            if let Some(score) = doc.get(SCORE_FIELD) {
                projected.insert(SCORE_FIELD.to_string(), score.clone());
            }
            projected
        })
        .collect()
}

/// Window `[offset, offset + limit)` of `docs`, clamped.
///
/// A negative offset reads as 0 and a limit of 0 or less means no limit.
pub fn apply_paging<T>(docs: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit)
        .ok()
        .filter(|limit| *limit > 0)
        .unwrap_or(usize::MAX);

    docs.into_iter().skip(offset).take(limit).collect()
}
