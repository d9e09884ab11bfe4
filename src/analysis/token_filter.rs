//! Token filters transform or remove tokens in a [`TokenStream`].
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseFilter`] - lowercases token text
//! - [`stop::StopFilter`] - removes stop words
//! - [`stem::StemFilter`] - reduces words to their stems
//! - [`length::LengthFilter`] - drops short and numeric tokens
//! - [`shingle::ShingleFilter`] - appends word n-grams
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::token::Token;
//! use halberd::analysis::token_filter::Filter;
//! use halberd::analysis::token_filter::lowercase::LowercaseFilter;
//!
//! let filter = LowercaseFilter::new();
//! let tokens = vec![Token::new("Hello", 0), Token::new("WORLD", 1)];
//! let filtered: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(filtered[0].text, "hello");
//! assert_eq!(filtered[1].text, "world");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter.
    fn name(&self) -> &'static str;
}

pub mod length;
pub mod lowercase;
pub mod shingle;
pub mod stem;
pub mod stop;
