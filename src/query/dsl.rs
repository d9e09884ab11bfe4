//! Query DSL data model.
//!
//! Requests deserialize straight into these types. Shapes that cannot be
//! evaluated (a case naming two condition kinds, a `bool` with two populated
//! clauses, an unknown operation) are rejected while parsing.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregation::Aggregation;
use crate::document::scalar_to_string;
use crate::geo::GeoPoint;
use crate::loader::Composite;

/// Comparison applied by `term` and `filter` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    /// Values are equal
    #[default]
    Equal,
    /// Values differ
    NotEqual,
    /// Document value is greater
    GreaterThan,
    /// Document value is less
    LessThan,
    /// Document value is greater or equal
    GreaterThanOrEqual,
    /// Document value is less or equal
    LessThanOrEqual,
    /// Document value contains the condition value
    Contains,
    /// Document value starts with the condition value
    StartsWith,
    /// Document value ends with the condition value
    EndsWith,
    /// Document value is one of a comma-separated list or a subquery result
    In,
    /// Document value is none of a comma-separated list or a subquery result
    NotIn,
}

const OPERATIONS: [Operation; 11] = [
    Operation::Equal,
    Operation::NotEqual,
    Operation::GreaterThan,
    Operation::LessThan,
    Operation::GreaterThanOrEqual,
    Operation::LessThanOrEqual,
    Operation::Contains,
    Operation::StartsWith,
    Operation::EndsWith,
    Operation::In,
    Operation::NotIn,
];

impl Operation {
    /// Operation for its wire number.
    pub fn from_code(code: u64) -> Option<Operation> {
        OPERATIONS.get(usize::try_from(code).ok()?).copied()
    }

    /// Operation for a name such as `greaterThan` or `not_in`, ignoring case.
    pub fn from_name(name: &str) -> Option<Operation> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        OPERATIONS
            .iter()
            .find(|op| format!("{op:?}").to_ascii_lowercase() == normalized)
            .copied()
    }

    /// Whether this is a set-membership operation.
    pub fn is_membership(&self) -> bool {
        matches!(self, Operation::In | Operation::NotIn)
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Operation::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("unknown operation {code}"))),
            Raw::Name(name) => Operation::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown operation {name:?}"))),
        }
    }
}

/// Modifiers of a field condition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Modifiers {
    /// Comparison to apply
    #[serde(default)]
    pub operation: Operation,
}

/// Deserialize an optional scalar (string, number, or bool) as its string form.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a string, number, or boolean")),
    }
}

/// `term` and `filter` conditions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldCondition {
    /// Dotted field path
    pub field: String,
    /// Condition value; a comma-separated list for `In`/`NotIn`
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
    /// Subquery producing the value set for `In`/`NotIn`
    #[serde(default, alias = "subQuery")]
    pub subquery: Option<Box<Query>>,
    /// Comparison modifiers
    #[serde(default)]
    pub modifiers: Option<Modifiers>,
}

impl FieldCondition {
    /// The comparison to apply, `Equal` by default.
    pub fn operation(&self) -> Operation {
        self.modifiers.map(|m| m.operation).unwrap_or_default()
    }

    /// The condition value, empty when absent.
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Scored full-text `match` condition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Match {
    /// Dotted field path
    pub field: String,
    /// Query text
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
    /// Maximum edit distance for fuzzy token matching
    #[serde(default)]
    pub fuzziness: Option<usize>,
    /// Score multiplier, 1 by default
    #[serde(default)]
    pub boost: Option<f64>,
}

/// Scored `matchPhrase` condition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchPhrase {
    /// Dotted field path
    pub field: String,
    /// Phrase text
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
    /// Intervening document tokens allowed across the phrase
    #[serde(default)]
    pub slop: Option<usize>,
    /// Edit distance allowed per phrase token
    #[serde(default)]
    pub fuzziness: Option<usize>,
    /// Score multiplier, 1 by default
    #[serde(default)]
    pub boost: Option<f64>,
}

/// Half-open `[from, to)` range over numbers or dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Range {
    /// Dotted field path
    pub field: String,
    /// Inclusive lower bound
    #[serde(default, deserialize_with = "scalar_string")]
    pub from: Option<String>,
    /// Exclusive upper bound
    #[serde(default, deserialize_with = "scalar_string")]
    pub to: Option<String>,
}

/// Radius search around a point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoDistance {
    /// Field holding the document point
    pub field: String,
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lon: f64,
    /// Radius in `unit`
    pub distance: f64,
    /// `km` (default) or `mi`
    #[serde(default)]
    pub unit: String,
}

/// Point-in-polygon condition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoPolygon {
    /// Field holding the document point
    pub field: String,
    /// Polygon vertices
    pub points: Vec<GeoPoint>,
}

/// Point inside any of several polygons.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoMultiPolygon {
    /// Field holding the document point
    pub field: String,
    /// Polygons, each a vertex list
    pub polygons: Vec<Vec<GeoPoint>>,
}

/// Proximity to a polyline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeoLine {
    /// Field holding the document point
    pub field: String,
    /// Polyline vertices, at least two
    pub line: Vec<GeoPoint>,
    /// Maximum distance from the line in `unit`
    pub distance: f64,
    /// `km` (default) or `mi`
    #[serde(default)]
    pub unit: String,
}

/// Condition applied to the objects of an array field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Nested {
    /// Dotted path of the array
    pub path: String,
    /// Condition each element is tested with
    #[serde(default)]
    pub bool: Bool,
}

/// `exists` and `missing` conditions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPresence {
    /// Dotted field path
    pub field: String,
}

/// Template predicate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateCondition {
    /// Template source; matches when it renders `true`
    pub code: String,
}

/// One condition of a boolean clause.
#[derive(Debug, Clone, Deserialize)]
pub enum Case {
    /// Exact or comparison test, score 0
    #[serde(rename = "term")]
    Term(FieldCondition),
    /// Same semantics as `term`
    #[serde(rename = "filter")]
    Filter(FieldCondition),
    /// Scored full-text match
    #[serde(rename = "match")]
    Match(Match),
    /// Scored phrase match
    #[serde(rename = "matchPhrase", alias = "match_phrase")]
    MatchPhrase(MatchPhrase),
    /// Numeric or date range
    #[serde(rename = "range")]
    Range(Range),
    /// Radius search
    #[serde(rename = "geoDistance", alias = "geo_distance")]
    GeoDistance(GeoDistance),
    /// Polygon containment
    #[serde(rename = "geoPolygon", alias = "geo_polygon")]
    GeoPolygon(GeoPolygon),
    /// Containment in any polygon
    #[serde(rename = "geoMultiPolygon", alias = "geo_multi_polygon")]
    GeoMultiPolygon(GeoMultiPolygon),
    /// Proximity to a polyline
    #[serde(rename = "geoLine", alias = "geo_line")]
    GeoLine(GeoLine),
    /// Array element condition
    #[serde(rename = "nested")]
    Nested(Nested),
    /// Field present and non-null
    #[serde(rename = "exists")]
    Exists(FieldPresence),
    /// Field absent or null
    #[serde(rename = "missing")]
    Missing(FieldPresence),
    /// Template predicate
    #[serde(rename = "template")]
    Template(TemplateCondition),
    /// Nested boolean clause
    #[serde(rename = "bool")]
    Bool(Bool),
}

impl Case {
    /// Name of the condition kind as written in requests.
    pub fn kind(&self) -> &'static str {
        match self {
            Case::Term(_) => "term",
            Case::Filter(_) => "filter",
            Case::Match(_) => "match",
            Case::MatchPhrase(_) => "matchPhrase",
            Case::Range(_) => "range",
            Case::GeoDistance(_) => "geoDistance",
            Case::GeoPolygon(_) => "geoPolygon",
            Case::GeoMultiPolygon(_) => "geoMultiPolygon",
            Case::GeoLine(_) => "geoLine",
            Case::Nested(_) => "nested",
            Case::Exists(_) => "exists",
            Case::Missing(_) => "missing",
            Case::Template(_) => "template",
            Case::Bool(_) => "bool",
        }
    }
}

/// Boolean composition of cases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawBool")]
pub enum Bool {
    /// Every case must match; scores add up
    All(Vec<Case>),
    /// At least one case must match; the best score wins
    One(Vec<Case>),
    /// No case may match; score 0
    None(Vec<Case>),
    /// The first case must not match; score 0
    Not(Vec<Case>),
    /// Matches everything with score 0
    #[default]
    Empty,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBool {
    #[serde(default)]
    all: Vec<Case>,
    #[serde(default)]
    one: Vec<Case>,
    #[serde(default)]
    none: Vec<Case>,
    #[serde(default)]
    not: Vec<Case>,
}

impl TryFrom<RawBool> for Bool {
    type Error = String;

    fn try_from(raw: RawBool) -> Result<Self, Self::Error> {
        let clauses = [
            ("all", raw.all),
            ("one", raw.one),
            ("none", raw.none),
            ("not", raw.not),
        ];
        let mut populated = clauses.into_iter().filter(|(_, cases)| !cases.is_empty());
        let first = populated.next();
        if let Some((extra, _)) = populated.next() {
            return Err(format!(
                "bool accepts exactly one of all/one/none/not, found '{}' and '{extra}'",
                first.map(|(name, _)| name).unwrap_or_default()
            ));
        }
        Ok(match first {
            Some(("all", cases)) => Bool::All(cases),
            Some(("one", cases)) => Bool::One(cases),
            Some(("none", cases)) => Bool::None(cases),
            Some((_, cases)) => Bool::Not(cases),
            None => Bool::Empty,
        })
    }
}

impl Bool {
    /// Cases of the populated clause.
    pub fn cases(&self) -> &[Case] {
        match self {
            Bool::All(cases) | Bool::One(cases) | Bool::None(cases) | Bool::Not(cases) => cases,
            Bool::Empty => &[],
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    /// Dotted field path, or `_score`
    pub field: String,
    /// Direction
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    /// Sort by a field in the given direction.
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        SortField {
            field: field.into(),
            order,
        }
    }
}

/// How function results combine with the query score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMode {
    /// `score * f`
    #[default]
    Multiply,
    /// `score + f`
    Sum,
    /// `f`
    Replace,
}

impl<'de> Deserialize<'de> for CombineMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(match name.to_ascii_lowercase().as_str() {
            "sum" => CombineMode::Sum,
            "replace" => CombineMode::Replace,
            _ => CombineMode::Multiply,
        })
    }
}

/// One score function.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreFunction {
    /// Informational kind such as `factor` or `decay`
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Template rendering a number
    pub code: String,
    /// Multiplier of the rendered number, 1 by default
    #[serde(default)]
    pub weight: Option<f64>,
    /// Informational field name
    #[serde(default)]
    pub field: Option<String>,
}

/// Custom scoring applied after matching.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionScore {
    /// Combination of function results with the query score
    #[serde(default)]
    pub combine: CombineMode,
    /// Functions, applied in order
    #[serde(default)]
    pub functions: Vec<ScoreFunction>,
}

/// A single query against one index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Boolean condition tree; empty matches everything
    #[serde(default)]
    pub bool: Bool,
    /// Index id
    #[serde(default)]
    pub index: String,
    /// Field values scoping the loader's scan
    #[serde(default)]
    pub composite: Composite,
    /// Field collected from matches when used as a subquery
    #[serde(default)]
    pub result_field: Option<String>,
    /// Sort keys
    #[serde(default)]
    pub sort: Vec<SortField>,
    /// Page size; zero or negative returns everything
    #[serde(default)]
    pub limit: i64,
    /// Page start
    #[serde(default)]
    pub offset: i64,
    /// Projected fields
    #[serde(default)]
    pub source: Vec<String>,
    /// Aggregations, keyed by name
    #[serde(default)]
    pub aggs: BTreeMap<String, Aggregation>,
    /// Custom scoring
    #[serde(default)]
    pub score_modifiers: Option<FunctionScore>,
}

impl Query {
    /// Whether any result control besides the condition is set.
    pub fn has_controls(&self) -> bool {
        !self.sort.is_empty()
            || self.limit != 0
            || self.offset != 0
            || !self.source.is_empty()
            || !self.aggs.is_empty()
            || self.score_modifiers.is_some()
    }
}

/// Ordered queries whose matches are merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnionQuery {
    /// Queries, run in order
    #[serde(default)]
    pub queries: Vec<Query>,
}

/// A request body: a single query or a union.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopLevelQuery {
    /// Single query
    #[serde(default)]
    pub query: Option<Query>,
    /// Union of queries
    #[serde(default)]
    pub union: Option<UnionQuery>,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
