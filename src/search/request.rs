//! Request parsing and validation.

use tracing::debug;

use crate::aggregation::Aggregation;
use crate::error::{HalberdError, Result};
use crate::query::{Bool, Case, Query, TopLevelQuery};
use crate::template::TemplateCache;

/// A validated request: one query, or the queries of a union in order.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    queries: Vec<Query>,
    union: bool,
}

impl SearchRequest {
    /// Parse a JSON request body.
    ///
    /// Malformed JSON, a body with neither or both of `query` and `union`,
    /// and a union without queries are query errors.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let top: TopLevelQuery = serde_json::from_slice(body)
            .map_err(|e| HalberdError::query(format!("invalid search query format: {e}")))?;
        Self::from_top_level(top)
    }

    /// Validate a parsed request.
    ///
    /// Every aggregation tree is checked as well; an invalid shape is a query
    /// error rather than a partially computed result.
    pub fn from_top_level(top: TopLevelQuery) -> Result<Self> {
        let request = match (top.query, top.union) {
            (Some(query), None) => Self::single(query),
            (None, Some(union)) => Self::union(union.queries)?,
            (Some(_), Some(_)) => {
                return Err(HalberdError::query(
                    "request body must contain either 'query' or 'union', not both",
                ));
            }
            (None, None) => {
                return Err(HalberdError::query(
                    "request body must contain 'query' or 'union'",
                ));
            }
        };
        for query in &request.queries {
            validate_aggregations(query)?;
        }
        Ok(request)
    }

    /// A request of one query.
    fn single(query: Query) -> Self {
        SearchRequest {
            queries: vec![query],
            union: false,
        }
    }

    /// A union of queries. At least one query is required.
    fn union(queries: Vec<Query>) -> Result<Self> {
        if queries.is_empty() {
            return Err(HalberdError::query("no queries found to execute"));
        }
        Ok(SearchRequest {
            queries,
            union: true,
        })
    }

    /// Queries in execution order.
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// The query whose result controls apply to the merged matches.
    pub fn primary(&self) -> &Query {
        &self.queries[0]
    }

    pub fn is_union(&self) -> bool {
        self.union
    }

    /// Every template source in the request: template conditions,
    /// subqueries, score functions, scripted and `bucket_script` metrics.
    pub fn template_sources(&self) -> Vec<&str> {
        let mut sources = Vec::new();
        for query in &self.queries {
            query_templates(query, &mut sources);
        }
        sources
    }

    /// Compile every template of the request into `cache`.
    pub fn compile_templates(&self, cache: &TemplateCache) -> Result<usize> {
        let sources = self.template_sources();
        for source in &sources {
            cache.get_or_compile(source)?;
        }
        debug!(templates = sources.len(), "compiled request templates");
        Ok(sources.len())
    }
}

fn validate_aggregations(query: &Query) -> Result<()> {
    for (name, agg) in &query.aggs {
        agg.validate(name, true)?;
    }
    Ok(())
}

fn query_templates<'a>(query: &'a Query, out: &mut Vec<&'a str>) {
    bool_templates(&query.bool, out);
    if let Some(function_score) = &query.score_modifiers {
        out.extend(function_score.functions.iter().map(|f| f.code.as_str()));
    }
    for agg in query.aggs.values() {
        aggregation_templates(agg, out);
    }
}

fn bool_templates<'a>(condition: &'a Bool, out: &mut Vec<&'a str>) {
    for case in condition.cases() {
        match case {
            Case::Template(template) => out.push(&template.code),
            Case::Bool(inner) => bool_templates(inner, out),
            Case::Nested(nested) => bool_templates(&nested.bool, out),
            Case::Term(field) | Case::Filter(field) => {
                if let Some(subquery) = &field.subquery {
                    query_templates(subquery, out);
                }
            }
            _ => {}
        }
    }
}

fn aggregation_templates<'a>(agg: &'a Aggregation, out: &mut Vec<&'a str>) {
    for metric in &agg.metrics {
        if let Some(scripted) = &metric.scripted {
            out.push(&scripted.script);
        }
        if metric.is_bucket_script() && !metric.script.is_empty() {
            out.push(&metric.script);
        }
    }
    for sub in agg.aggs.values() {
        aggregation_templates(sub, out);
    }
}
