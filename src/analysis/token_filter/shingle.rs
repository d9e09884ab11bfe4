//! Shingle filter implementation.
//!
//! Emits the incoming tokens followed by every word n-gram between two and
//! `max_size` tokens long, joined by a single space. Duplicates are dropped
//! while keeping the first occurrence, so the output reads as a token set in
//! insertion order.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::token::Token;
//! use halberd::analysis::token_filter::Filter;
//! use halberd::analysis::token_filter::shingle::ShingleFilter;
//!
//! let filter = ShingleFilter::new(3);
//! let tokens = vec![Token::new("high", 0), Token::new("quality", 1)];
//! let result: Vec<_> = filter
//!     .filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//!
//! assert_eq!(result, vec!["high", "quality", "high quality"]);
//! ```

use ahash::AHashSet;

use super::Filter;
use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// A filter that appends word n-grams to the token stream.
#[derive(Clone, Debug)]
pub struct ShingleFilter {
    max_size: usize,
}

impl ShingleFilter {
    /// Create a shingle filter producing n-grams up to `max_size` words.
    pub fn new(max_size: usize) -> Self {
        ShingleFilter {
            max_size: max_size.max(1),
        }
    }

    /// Largest n-gram size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Filter for ShingleFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let base: Vec<Token> = tokens.filter(|t| !t.is_stopped()).collect();
        let mut output = base.clone();

        for size in 2..=self.max_size {
            if base.len() < size {
                break;
            }
            for window in base.windows(size) {
                let text = window
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                output.push(Token::with_offsets(
                    text,
                    window[0].position,
                    window[0].start_offset,
                    window[size - 1].end_offset,
                ));
            }
        }

        let mut seen = AHashSet::new();
        output.retain(|token| seen.insert(token.text.clone()));

        Ok(Box::new(output.into_iter()))
    }

    fn name(&self) -> &'static str {
        "shingle"
    }
}
