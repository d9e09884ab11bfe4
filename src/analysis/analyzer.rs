//! Analyzers combine char filters, a tokenizer, and token filters.

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that turn text into a token stream.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer.
    fn name(&self) -> &str;
}

pub mod dsl;
pub mod pipeline;

pub use dsl::DslAnalyzer;
pub use pipeline::PipelineAnalyzer;
