//! Boolean composition, case dispatch, and the structural conditions.

use serde_json::Value;
use tracing::warn;

use crate::document::{Document, resolve_raw};
use crate::query::dsl::{Bool, Case, FieldPresence, Nested, TemplateCondition};
use crate::query::{Condition, EvalContext, Evaluation};

impl Condition for Bool {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        match self {
            Bool::All(cases) => {
                let mut total = 0.0;
                for case in cases {
                    let result = case.evaluate(doc, ctx);
                    if !result.matched {
                        return Evaluation::NO_MATCH;
                    }
                    total += result.score;
                }
                Evaluation::hit(total)
            }
            Bool::One(cases) => cases
                .iter()
                .map(|case| case.evaluate(doc, ctx))
                .filter(|result| result.matched)
                .reduce(|best, next| if next.score > best.score { next } else { best })
                .unwrap_or(Evaluation::NO_MATCH),
            Bool::None(cases) => {
                let any = cases.iter().any(|case| case.evaluate(doc, ctx).matched);
                Evaluation::from_bool(!any)
            }
            Bool::Not(cases) => {
                if cases.len() > 1 {
                    warn!(ignored = cases.len() - 1, "bool.not evaluates only its first case");
                }
                match cases.first() {
                    Some(case) => Evaluation::from_bool(!case.evaluate(doc, ctx).matched),
                    None => Evaluation::from_bool(true),
                }
            }
            Bool::Empty => Evaluation::from_bool(true),
        }
    }
}

impl Condition for Case {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        if ctx.cancel.is_cancelled() {
            return Evaluation::NO_MATCH;
        }
        match self {
            Case::Term(c) | Case::Filter(c) => c.evaluate(doc, ctx),
            Case::Match(c) => c.evaluate(doc, ctx),
            Case::MatchPhrase(c) => c.evaluate(doc, ctx),
            Case::Range(c) => c.evaluate(doc, ctx),
            Case::GeoDistance(c) => c.evaluate(doc, ctx),
            Case::GeoPolygon(c) => c.evaluate(doc, ctx),
            Case::GeoMultiPolygon(c) => c.evaluate(doc, ctx),
            Case::GeoLine(c) => c.evaluate(doc, ctx),
            Case::Nested(c) => c.evaluate(doc, ctx),
            Case::Exists(c) => Evaluation::from_bool(c.is_present(doc)),
            Case::Missing(c) => Evaluation::from_bool(!c.is_present(doc)),
            Case::Template(c) => c.evaluate(doc, ctx),
            Case::Bool(c) => c.evaluate(doc, ctx),
        }
    }
}

impl FieldPresence {
    /// Whether the field resolves to a non-null value.
    pub fn is_present(&self, doc: &Document) -> bool {
        resolve_raw(doc, &self.field).is_some_and(|value| !value.is_null())
    }
}

impl Condition for Nested {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        let Some(Value::Array(items)) = resolve_raw(doc, &self.path) else {
            return Evaluation::NO_MATCH;
        };
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| self.bool.evaluate(item, ctx))
            .filter(|result| result.matched)
            .reduce(|best, next| if next.score > best.score { next } else { best })
            .unwrap_or(Evaluation::NO_MATCH)
    }
}

impl Condition for TemplateCondition {
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation {
        let result = ctx
            .templates
            .get_or_compile(&self.code)
            .and_then(|template| template.render_bool(doc));
        match result {
            Ok(matched) => Evaluation::from_bool(matched),
            Err(e) => {
                warn!(error = %e, "template condition failed");
                Evaluation::NO_MATCH
            }
        }
    }
}
