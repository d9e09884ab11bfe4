//! Scored `match` condition.

use ahash::AHashSet;
use serde_json::Value;
use tracing::{trace, warn};

use crate::document::{Document, resolve_raw, resolve_str};
use crate::query::dsl::Match;
use crate::query::{Condition, EvalContext, Evaluation};
use crate::util::levenshtein::FuzzyMatcher;

/// Documents with more analyzed tokens than this are length-normalized.
pub(crate) const LENGTH_NORM_THRESHOLD: usize = 10;

/// Dampening factor for long documents: `1 / ln(n + 1)` past the threshold.
pub(crate) fn doc_length_factor(token_count: usize) -> f64 {
    if token_count > LENGTH_NORM_THRESHOLD {
        1.0 / ((token_count + 1) as f64).ln()
    } else {
        1.0
    }
}

/// Best fuzzy score of the raw document tokens against the query.
///
/// Tokens are runs of letters and digits. A token within `max_distance`
/// edits scores `1 + (max_distance - distance) / max_distance`; an exact
/// match under `max_distance == 0` scores 2.
fn fuzzy_score(text: &str, query: &str, max_distance: usize) -> Option<f64> {
    let matcher = FuzzyMatcher::new(query);
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter_map(|token| matcher.within(token, max_distance))
        .map(|distance| {
            let bonus = if max_distance == 0 {
                1.0
            } else {
                (max_distance - distance) as f64 / max_distance as f64
            };
            1.0 + bonus
        })
        .max_by(|a, b| a.total_cmp(b))
}

impl Match {
    fn analyzed_score(&self, doc_text: &str, query: &str, ctx: &EvalContext<'_>) -> Option<f64> {
        let analyze = |text: &str| {
            ctx.analyzer.analyze(text).unwrap_or_else(|e| {
                warn!(field = %self.field, error = %e, "analysis failed");
                Vec::new()
            })
        };
        let query_tokens = analyze(query);
        if query_tokens.is_empty() {
            return None;
        }
        let doc_tokens = analyze(doc_text);
        let doc_set: AHashSet<&str> = doc_tokens.iter().map(String::as_str).collect();

        let overlap = query_tokens
            .iter()
            .filter(|token| doc_set.contains(token.as_str()))
            .count();
        if overlap == 0 {
            return None;
        }
        Some(overlap as f64 * doc_length_factor(doc_tokens.len()))
    }
}

impl Condition for Match {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        let query = self.value.as_deref().unwrap_or_default();
        if self.field.is_empty() || query.is_empty() {
            return Evaluation::NO_MATCH;
        }
        let raw = match resolve_raw(doc, &self.field) {
            Some(value) if !value.is_null() => value,
            _ => return Evaluation::NO_MATCH,
        };
        let boost = self.boost.unwrap_or(1.0);

        if let Some(max_distance) = self.fuzziness {
            let text = match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if let Some(score) = fuzzy_score(&text, query, max_distance) {
                trace!(field = %self.field, score, "fuzzy match");
                return Evaluation::hit(score * boost);
            }
        }

        let doc_text = resolve_str(doc, &self.field).unwrap_or_default();
        match self.analyzed_score(&doc_text, query, ctx) {
            Some(score) => Evaluation::hit(score * boost),
            None => Evaluation::NO_MATCH,
        }
    }
}
