//! Query DSL and per-document evaluation.
//!
//! A request's condition tree ([`Bool`] of [`Case`]s) is evaluated once per
//! document and yields an [`Evaluation`]: whether the document matched and
//! the relevance score it earned. Only `match` and `matchPhrase` produce
//! positive scores. `bool.all` adds child scores, `bool.one` keeps the best,
//! and every filter-style condition scores 0.
//!
//! Evaluation never fails. Resolution misses, unparseable values, template
//! errors, and loader failures inside subqueries all read as a non-match,
//! and the surprising ones are logged.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::DslAnalyzer;
//! use halberd::cancel::CancellationToken;
//! use halberd::config::EngineConfig;
//! use halberd::loader::{IndexConfig, StaticLoader};
//! use halberd::query::{Bool, Condition, EvalContext};
//! use halberd::template::TemplateCache;
//! use serde_json::json;
//!
//! let condition: Bool = serde_json::from_value(json!({
//!     "all": [{"match": {"field": "title", "value": "red car"}}]
//! }))
//! .unwrap();
//!
//! let loader = StaticLoader::new();
//! let index = IndexConfig::default();
//! let cancel = CancellationToken::new();
//! let templates = TemplateCache::default();
//! let analyzer = DslAnalyzer::new().unwrap();
//! let config = EngineConfig::default();
//! let ctx = EvalContext::new(&loader, &index, &cancel, &templates, &analyzer, &config);
//!
//! let doc = json!({"title": "red car fast"}).as_object().cloned().unwrap();
//! let result = condition.evaluate(&doc, &ctx);
//! assert!(result.matched);
//! // "red", "car" and the bigram "red car" all overlap
//! assert_eq!(result.score, 3.0);
//! ```

use std::fmt;

use crate::analysis::DslAnalyzer;
use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::loader::{DocumentLoader, IndexConfig};
use crate::template::TemplateCache;

pub mod dsl;

mod boolean;
mod geo;
mod phrase;
mod range;
mod subquery;
mod term;
mod text;

pub use dsl::{
    Bool, Case, CombineMode, FieldCondition, FieldPresence, FunctionScore, GeoDistance,
    GeoLine, GeoMultiPolygon, GeoPolygon, Match, MatchPhrase, Modifiers, Nested, Operation,
    Query, Range, ScoreFunction, SortField, SortOrder, TemplateCondition, TopLevelQuery,
    UnionQuery,
};
pub use subquery::execute_subquery;
pub use term::compare_values;

/// Outcome of evaluating a condition against one document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Evaluation {
    /// Whether the document satisfied the condition
    pub matched: bool,
    /// Relevance contribution, 0 for filters and non-matches
    pub score: f64,
}

impl Evaluation {
    /// A non-match.
    pub const NO_MATCH: Evaluation = Evaluation {
        matched: false,
        score: 0.0,
    };

    /// A match with the given score.
    pub fn hit(score: f64) -> Self {
        Evaluation {
            matched: true,
            score,
        }
    }

    /// A filter outcome, scoring 0 either way.
    pub fn from_bool(matched: bool) -> Self {
        Evaluation {
            matched,
            score: 0.0,
        }
    }
}

/// Everything a condition may consult besides the document itself.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Loader used by subqueries
    pub loader: &'a dyn DocumentLoader,
    /// Index the outer query runs against; subqueries swap its id
    pub index: &'a IndexConfig,
    /// Cancellation signal of the running search
    pub cancel: &'a CancellationToken,
    /// Compiled template cache
    pub templates: &'a TemplateCache,
    /// Analyzer for `match` and `matchPhrase`
    pub analyzer: &'a DslAnalyzer,
    /// Engine limits
    pub config: &'a EngineConfig,
    /// Subquery nesting depth, 0 for the outer query
    pub depth: usize,
}

impl<'a> EvalContext<'a> {
    /// Context for a top-level query.
    pub fn new(
        loader: &'a dyn DocumentLoader,
        index: &'a IndexConfig,
        cancel: &'a CancellationToken,
        templates: &'a TemplateCache,
        analyzer: &'a DslAnalyzer,
        config: &'a EngineConfig,
    ) -> Self {
        EvalContext {
            loader,
            index,
            cancel,
            templates,
            analyzer,
            config,
            depth: 0,
        }
    }

    /// Context for a subquery against `index`, one level deeper.
    pub fn descend<'b>(&self, index: &'b IndexConfig) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            index,
            depth: self.depth + 1,
            ..*self
        }
    }
}

impl fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("index", &self.index.id)
            .field("depth", &self.depth)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A condition that can be tested against a document.
pub trait Condition {
    /// Evaluate against `doc`. Never fails; problems read as a non-match.
    fn evaluate(&self, doc: &Document, ctx: &EvalContext<'_>) -> Evaluation;
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::Value;

    use super::*;
    use crate::loader::StaticLoader;

    /// Owns everything an [`EvalContext`] borrows.
    pub struct Fixture {
        pub loader: StaticLoader,
        pub index: IndexConfig,
        pub cancel: CancellationToken,
        pub templates: TemplateCache,
        pub analyzer: DslAnalyzer,
        pub config: EngineConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_loader(StaticLoader::new())
        }

        pub fn with_loader(loader: StaticLoader) -> Self {
            Fixture {
                loader,
                index: IndexConfig::default(),
                cancel: CancellationToken::new(),
                templates: TemplateCache::default(),
                analyzer: DslAnalyzer::new().unwrap(),
                config: EngineConfig::default(),
            }
        }

        pub fn ctx(&self) -> EvalContext<'_> {
            EvalContext::new(
                &self.loader,
                &self.index,
                &self.cancel,
                &self.templates,
                &self.analyzer,
                &self.config,
            )
        }
    }

    pub fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    pub fn case(value: Value) -> Case {
        serde_json::from_value(value).unwrap()
    }

    pub fn bool_of(value: Value) -> Bool {
        serde_json::from_value(value).unwrap()
    }
}
