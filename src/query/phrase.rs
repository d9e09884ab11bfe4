//! Scored `matchPhrase` condition.

use tracing::{trace, warn};

use crate::document::{Document, resolve_str};
use crate::query::dsl::MatchPhrase;
use crate::query::text::doc_length_factor;
use crate::query::{Condition, EvalContext, Evaluation};
use crate::util::levenshtein::damerau_levenshtein_distance;

/// Base weight of a phrase hit relative to a single-token match.
const PHRASE_WEIGHT: f64 = 2.5;

/// Slop and edit distance spent by one matched sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PhraseMatch {
    slop: usize,
    fuzziness: usize,
}

/// Match the query tokens in order starting at `start`.
///
/// Each following query token binds to the first document token within
/// `max_fuzziness` edits. If binding it would spend more than `max_slop`
/// skipped tokens overall, the start position is abandoned.
fn match_from(
    doc: &[String],
    query: &[String],
    start: usize,
    max_slop: usize,
    max_fuzziness: usize,
) -> Option<PhraseMatch> {
    let first = damerau_levenshtein_distance(&doc[start], &query[0]);
    if first > max_fuzziness {
        return None;
    }

    let mut spent = PhraseMatch {
        slop: 0,
        fuzziness: first,
    };
    let mut position = start;
    for target in &query[1..] {
        let (next, distance) = doc
            .iter()
            .enumerate()
            .skip(position + 1)
            .map(|(i, token)| (i, damerau_levenshtein_distance(token, target)))
            .find(|(_, distance)| *distance <= max_fuzziness)?;

        let gap = next - position - 1;
        if spent.slop + gap > max_slop {
            return None;
        }
        spent.slop += gap;
        spent.fuzziness += distance;
        position = next;
    }
    Some(spent)
}

/// Tightest in-order match of `query` in `doc`.
fn best_match(
    doc: &[String],
    query: &[String],
    max_slop: usize,
    max_fuzziness: usize,
) -> Option<PhraseMatch> {
    if query.is_empty() || doc.is_empty() || query.len() > doc.len() {
        return None;
    }
    (0..=doc.len() - query.len())
        .filter_map(|start| match_from(doc, query, start, max_slop, max_fuzziness))
        .min()
}

impl Condition for MatchPhrase {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        let phrase = self.value.as_deref().unwrap_or_default();
        if self.field.is_empty() || phrase.is_empty() {
            return Evaluation::NO_MATCH;
        }
        let max_slop = self.slop.unwrap_or(0);
        let max_fuzziness = self.fuzziness.unwrap_or(0);
        let boost = self.boost.unwrap_or(1.0);

        let analyze = |text: &str| {
            ctx.analyzer.analyze_for_phrase(text).unwrap_or_else(|e| {
                warn!(field = %self.field, error = %e, "phrase analysis failed");
                Vec::new()
            })
        };
        let doc_tokens = analyze(&resolve_str(doc, &self.field).unwrap_or_default());
        let query_tokens = analyze(phrase);

        let Some(best) = best_match(&doc_tokens, &query_tokens, max_slop, max_fuzziness) else {
            return Evaluation::NO_MATCH;
        };

        let proximity = if max_slop > 0 {
            1.0 - best.slop as f64 / (max_slop + 1) as f64
        } else {
            1.0
        };
        let effective_tf = query_tokens
            .len()
            .saturating_sub(best.slop + best.fuzziness)
            .max(1) as f64;
        let score = effective_tf * doc_length_factor(doc_tokens.len()) * PHRASE_WEIGHT * proximity * boost;
        trace!(field = %self.field, slop = best.slop, fuzziness = best.fuzziness, score, "phrase match");
        Evaluation::hit(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{Fixture, case, doc};
    use serde_json::json;

    fn tokens(words: &str) -> Vec<String> {
        words.split_whitespace().map(str::to_string).collect()
    }

    fn eval(condition: serde_json::Value, d: serde_json::Value) -> Evaluation {
        let fixture = Fixture::new();
        case(json!({ "matchPhrase": condition })).evaluate(&doc(d), &fixture.ctx())
    }

    #[test]
    fn test_best_match() {
        let doc = tokens("quick red brown fox");
        let query = tokens("quick brown");
        assert_eq!(best_match(&doc, &query, 0, 0), None);
        assert_eq!(
            best_match(&doc, &query, 1, 0),
            Some(PhraseMatch { slop: 1, fuzziness: 0 })
        );

        let doc = tokens("quick brown quick red brown");
        assert_eq!(
            best_match(&doc, &query, 2, 0),
            Some(PhraseMatch { slop: 0, fuzziness: 0 })
        );

        let doc = tokens("quik brown");
        assert_eq!(
            best_match(&doc, &query, 0, 1),
            Some(PhraseMatch { slop: 0, fuzziness: 1 })
        );
        assert_eq!(best_match(&tokens("brown"), &query, 5, 5), None);
    }

    #[test]
    fn test_slop_ranking() {
        let exact = eval(
            json!({"field": "text", "value": "quick brown", "slop": 1}),
            json!({"text": "quick brown fox"}),
        );
        let loose = eval(
            json!({"field": "text", "value": "quick brown", "slop": 1}),
            json!({"text": "quick red brown fox"}),
        );
        assert_eq!(exact, Evaluation::hit(5.0));
        assert_eq!(loose, Evaluation::hit(1.25));
    }

    #[test]
    fn test_order_matters() {
        let reversed = eval(
            json!({"field": "text", "value": "brown quick", "slop": 3}),
            json!({"text": "quick brown fox"}),
        );
        assert!(!reversed.matched);
    }

    #[test]
    fn test_fuzzy_phrase_with_boost() {
        let hit = eval(
            json!({"field": "text", "value": "quick brwn", "fuzziness": 1, "boost": 2}),
            json!({"text": "quick brown fox"}),
        );
        // two tokens, one edit: effective tf 1
        assert_eq!(hit, Evaluation::hit(5.0));
    }
}
