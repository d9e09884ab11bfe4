//! Char filters rewrite raw text before it reaches the tokenizer.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::char_filter::CharFilter;
//! use halberd::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
//!
//! let filter = PatternReplaceCharFilter::new("-", " ").unwrap();
//! assert_eq!(filter.filter("high-quality"), "high quality");
//! ```

/// Trait for character filters that transform text before tokenization.
pub trait CharFilter: Send + Sync {
    /// Apply this filter to the input text.
    fn filter(&self, input: &str) -> String;

    /// Get the name of this char filter.
    fn name(&self) -> &'static str;
}

pub mod pattern_replace;
