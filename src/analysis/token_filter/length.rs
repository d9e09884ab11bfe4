//! Length filter implementation.
//!
//! Drops tokens that are too short to carry meaning (a frequent result of
//! aggressive stemming) and tokens that read as plain numbers.

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// A filter that removes short tokens and, optionally, numeric tokens.
#[derive(Clone, Debug)]
pub struct LengthFilter {
    min_chars: usize,
    drop_numeric: bool,
}

impl LengthFilter {
    /// Keep tokens of at least two chars that do not parse as a number.
    pub fn new() -> Self {
        LengthFilter {
            min_chars: 2,
            drop_numeric: true,
        }
    }

    /// Set the minimum token length in chars.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Keep tokens that parse as numbers.
    pub fn keep_numeric(mut self) -> Self {
        self.drop_numeric = false;
        self
    }

    fn keeps(&self, text: &str) -> bool {
        if text.chars().count() < self.min_chars {
            return false;
        }
        !(self.drop_numeric && text.parse::<f64>().is_ok())
    }
}

impl Default for LengthFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for LengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filter = self.clone();
        Ok(Box::new(tokens.filter(move |token| filter.keeps(&token.text))))
    }

    fn name(&self) -> &'static str {
        "length"
    }
}
