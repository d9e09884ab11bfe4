//! The analyzer used by `match` and `matchPhrase` conditions.
//!
//! Text runs through the same stages in both modes:
//!
//! 1. strip possessive `'s` and apostrophes before a word char, and turn
//!    hyphens into spaces
//! 2. split into `\w+` runs
//! 3. lowercase
//! 4. drop stop words
//! 5. stem with [`RuleStemmer`](crate::analysis::token_filter::stem::RuleStemmer)
//!    and drop stems that are stop words (`hers` stems to `her`)
//! 6. drop tokens shorter than two chars and tokens that parse as numbers
//!
//! Indexing mode then appends every bigram and trigram of the surviving
//! tokens and removes duplicates. Phrase mode stops after step 6 so that
//! token order stays meaningful.
//!
//! Analysis is idempotent on its own output: re-analyzing the joined phrase
//! tokens yields the same tokens.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::analyzer::DslAnalyzer;
//!
//! let analyzer = DslAnalyzer::new().unwrap();
//! assert_eq!(
//!     analyzer.analyze("John's high-quality cables").unwrap(),
//!     vec!["john", "high", "quality", "cable", "john high", "high quality",
//!          "quality cable", "john high quality", "high quality cable"]
//! );
//! ```

use std::sync::Arc;

use super::{Analyzer, PipelineAnalyzer};
use crate::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::length::LengthFilter;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::shingle::ShingleFilter;
use crate::analysis::token_filter::stem::StemFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::Result;

/// Largest word n-gram produced in indexing mode.
pub const MAX_SHINGLE_SIZE: usize = 3;

/// Analyzer with an indexing mode and a phrase mode.
#[derive(Clone, Debug)]
pub struct DslAnalyzer {
    phrase: PipelineAnalyzer,
    shingle: ShingleFilter,
}

impl DslAnalyzer {
    /// Build the analyzer, compiling its patterns.
    pub fn new() -> Result<Self> {
        let phrase = PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::possessive()?))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::apostrophe()?))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::hyphen()?))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(StopFilter::new()))
            .add_filter(Arc::new(StemFilter::new()))
            .add_filter(Arc::new(StopFilter::new()))
            .add_filter(Arc::new(LengthFilter::new()))
            .with_name("dsl");

        Ok(DslAnalyzer {
            phrase,
            shingle: ShingleFilter::new(MAX_SHINGLE_SIZE),
        })
    }

    /// Indexing mode: unigrams, then bigrams and trigrams, deduplicated.
    pub fn analyze(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self.shingle.filter(self.phrase.analyze(text)?)?;
        Ok(tokens.map(|t| t.text).collect())
    }

    /// Phrase mode: the ordered unigrams only.
    pub fn analyze_for_phrase(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.phrase.analyze(text)?.map(|t| t.text).collect())
    }
}

impl Analyzer for DslAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.shingle.filter(self.phrase.analyze(text)?)
    }

    fn name(&self) -> &str {
        "dsl"
    }
}
