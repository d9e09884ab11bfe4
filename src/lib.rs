//! # Halberd
//!
//! An in-memory query DSL evaluation and aggregation engine over JSON
//! documents streamed from a pluggable loader.
//!
//! ## Features
//!
//! - Boolean condition trees with term, range, full-text, phrase, geo,
//!   nested, template, and subquery conditions
//! - Relevance scoring with function-score modifiers
//! - Terms, range, date-histogram, and nested aggregations with metrics,
//!   top hits, bucket scripts, and pipelines
//! - Unions of queries merged in order
//! - Parallel evaluation with cooperative cancellation
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use halberd::prelude::*;
//! use serde_json::json;
//!
//! let loader = StaticLoader::new().with_shared(vec![
//!     json!({"id": 1, "status": "active"}),
//!     json!({"id": 2, "status": "retired"}),
//! ]);
//! let engine = SearchEngine::new(Arc::new(loader), EngineConfig::default()).unwrap();
//!
//! let payload = engine.handle(
//!     br#"{"query": {"index": "ads", "bool": {"all": [{"term": {"field": "status", "value": "active"}}]}}}"#,
//!     &IndexConfig::default(),
//!     &CancellationToken::new(),
//! );
//! assert_eq!(payload.status_code, 200);
//! assert_eq!(payload.body_data[0]["id"], 1);
//! ```

pub mod aggregation;
pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod geo;
pub mod loader;
pub mod query;
pub mod search;
pub mod template;
pub mod util;

pub mod prelude {
    pub use crate::aggregation::{Aggregation, AggregationResult, Bucket};
    pub use crate::cancel::CancellationToken;
    pub use crate::config::EngineConfig;
    pub use crate::document::Document;
    pub use crate::error::{HalberdError, Result};
    pub use crate::loader::{DirectoryLoader, DocumentLoader, IndexConfig, StaticLoader};
    pub use crate::query::{Query, TopLevelQuery};
    pub use crate::search::{SearchEngine, SearchRequest, SearchResponse, SearchResultPayload};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
