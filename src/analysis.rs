//! Text analysis for full-text conditions.
//!
//! Analysis turns field text and query text into comparable tokens. The
//! pipeline is built from small parts:
//!
//! - [`char_filter`] rewrites raw text before tokenization
//! - [`tokenizer`] splits text into tokens
//! - [`token_filter`] transforms or drops tokens
//! - [`analyzer`] chains the three and exposes the DSL analyzer with its
//!   indexing and phrase modes
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::analyzer::DslAnalyzer;
//!
//! let analyzer = DslAnalyzer::new().unwrap();
//! let tokens = analyzer.analyze_for_phrase("The quick foxes").unwrap();
//! assert_eq!(tokens, vec!["quick", "foxe"]);
//! ```

pub mod analyzer;
pub mod char_filter;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, DslAnalyzer, PipelineAnalyzer};
pub use token::{Token, TokenStream};
