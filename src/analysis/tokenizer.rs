//! Tokenizers split text into a stream of tokens.

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer.
    fn name(&self) -> &'static str;
}

pub mod regex;
