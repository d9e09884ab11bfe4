use regex::Regex;

use super::CharFilter;
use crate::error::{HalberdError, Result};

/// A char filter that replaces every match of a regex pattern.
#[derive(Clone, Debug)]
pub struct PatternReplaceCharFilter {
    pattern: Regex,
    replacement: String,
}

impl PatternReplaceCharFilter {
    /// Create a new pattern replace char filter.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern).map_err(|e| {
                HalberdError::invalid_argument(format!("Invalid regex pattern: {e}"))
            })?,
            replacement: replacement.to_string(),
        })
    }

    /// Strip the possessive `'s` ending ("John's" becomes "John").
    pub fn possessive() -> Result<Self> {
        Self::new(r"'s\b", "")
    }

    /// Drop apostrophes that precede a word character.
    pub fn apostrophe() -> Result<Self> {
        Self::new(r"'\b", "")
    }

    /// Split hyphenated compounds into separate words.
    pub fn hyphen() -> Result<Self> {
        Self::new("-", " ")
    }
}

impl CharFilter for PatternReplaceCharFilter {
    fn filter(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, self.replacement.as_str())
            .into_owned()
    }

    fn name(&self) -> &'static str {
        "pattern_replace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_replace() {
        let filter = PatternReplaceCharFilter::new(r"\d+", "NUM").unwrap();
        assert_eq!(filter.filter("Year 2024"), "Year NUM");
    }

    #[test]
    fn test_possessive_and_apostrophe() {
        let possessive = PatternReplaceCharFilter::possessive().unwrap();
        let apostrophe = PatternReplaceCharFilter::apostrophe().unwrap();

        assert_eq!(possessive.filter("John's car"), "John car");
        assert_eq!(apostrophe.filter("don't"), "dont");
        assert_eq!(possessive.filter("the cars' wheels"), "the cars' wheels");
    }

    #[test]
    fn test_hyphen() {
        let filter = PatternReplaceCharFilter::hyphen().unwrap();
        assert_eq!(filter.filter("state-of-the-art"), "state of the art");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PatternReplaceCharFilter::new("(", "").is_err());
    }
}
