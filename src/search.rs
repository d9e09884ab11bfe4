//! Request execution.
//!
//! A [`SearchRequest`] holds one query or an ordered union of queries. The
//! [`SearchEngine`] streams each query's documents from its loader, evaluates
//! them in parallel, merges the matches, and applies the first query's result
//! controls: score modifiers, then either aggregations or sort, projection,
//! and paging. [`SearchEngine::handle`] wraps the whole exchange into a
//! [`SearchResultPayload`] that never fails.

pub mod controls;
mod engine;
mod request;
mod response;

pub use controls::{apply_paging, apply_score_modifiers, apply_sort, project_fields};
pub use engine::SearchEngine;
pub use request::SearchRequest;
pub use response::{SearchResponse, SearchResultPayload};
