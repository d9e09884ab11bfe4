//! Stemming filter and the rule-based English stemmer.
//!
//! [`RuleStemmer`] strips common English suffixes in three passes: plurals,
//! past tense and participles, then derivational suffixes. A rule only fires
//! when the remaining stem still holds a vowel, where `y` counts as a vowel
//! when it follows a consonant. No rule may shrink a word below two chars.
//!
//! Dropping a suffix can expose another one (`differences` becomes `differ`,
//! which ends in `er`), so the passes repeat until the word stops changing.
//! Every rule shortens the word, which bounds the repetition.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::token_filter::stem::{RuleStemmer, Stemmer};
//!
//! let stemmer = RuleStemmer::new();
//! assert_eq!(stemmer.stem("running"), "run");
//! assert_eq!(stemmer.stem("caresses"), "caress");
//! assert_eq!(stemmer.stem("relational"), "relate");
//! ```

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;
use std::sync::Arc;

/// Trait for stemming algorithms.
pub trait Stemmer: Send + Sync {
    /// Stem a word to its root form.
    fn stem(&self, word: &str) -> String;

    /// Get the name of this stemmer.
    fn name(&self) -> &'static str;
}

/// Shortest stem any rule may leave behind.
const MIN_STEM_LEN: usize = 2;

/// Step 2 rewrites, checked in order.
const STEP2_RULES: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("alize", "al"),
    ("icate", "ic"),
    ("iciti", "ic"),
    ("fulness", ""),
];

/// Step 3 suffix drops, checked in order.
const STEP3_SUFFIXES: &[&str] = &["al", "ance", "ence", "er", "ic", "able", "ant", "ize"];

/// Rule-based suffix stripper for English.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleStemmer;

impl RuleStemmer {
    /// Create a new rule stemmer.
    pub fn new() -> Self {
        RuleStemmer
    }

    fn is_vowel(word: &[char], i: usize) -> bool {
        match word[i] {
            'a' | 'e' | 'i' | 'o' | 'u' => true,
            'y' => i > 0 && !Self::is_vowel(word, i - 1),
            _ => false,
        }
    }

    fn has_vowel(word: &[char]) -> bool {
        (0..word.len()).any(|i| Self::is_vowel(word, i))
    }

    fn ends_with(word: &[char], suffix: &str) -> bool {
        let suffix_len = suffix.chars().count();
        word.len() >= suffix_len && word[word.len() - suffix_len..].iter().copied().eq(suffix.chars())
    }

    /// Replace the last `strip` chars with `replacement` when the result stays long enough.
    fn rewrite(word: &mut Vec<char>, strip: usize, replacement: &str) -> bool {
        let new_len = word.len() - strip + replacement.chars().count();
        if new_len < MIN_STEM_LEN {
            return false;
        }
        word.truncate(word.len() - strip);
        word.extend(replacement.chars());
        true
    }

    fn step1a(word: &mut Vec<char>) {
        if Self::ends_with(word, "sses") {
            Self::rewrite(word, 4, "ss");
        } else if Self::ends_with(word, "ies") {
            Self::rewrite(word, 3, "i");
        } else if Self::ends_with(word, "s") && !Self::ends_with(word, "ss") && word.len() > 3 {
            Self::rewrite(word, 1, "");
        }
    }

    fn step1b(word: &mut Vec<char>) {
        let len = word.len();
        let changed = if Self::ends_with(word, "eed") {
            Self::has_vowel(&word[..len - 3]) && Self::rewrite(word, 1, "")
        } else if Self::ends_with(word, "ed") {
            Self::has_vowel(&word[..len - 2]) && Self::rewrite(word, 2, "")
        } else if Self::ends_with(word, "ing") {
            Self::has_vowel(&word[..len - 3]) && Self::rewrite(word, 3, "")
        } else {
            false
        };

        if changed {
            let len = word.len();
            if len > MIN_STEM_LEN
                && word[len - 1] == word[len - 2]
                && !matches!(word[len - 1], 'l' | 's' | 'z')
            {
                word.pop();
            }
        }
    }

    fn step2(word: &mut Vec<char>) {
        let len = word.len();
        if len <= 5 || !Self::has_vowel(&word[..len - 5]) {
            return;
        }
        if let Some((suffix, replacement)) = STEP2_RULES
            .iter()
            .find(|(suffix, _)| Self::ends_with(word, suffix))
        {
            Self::rewrite(word, suffix.chars().count(), replacement);
        }
    }

    fn step3(word: &mut Vec<char>) {
        let len = word.len();
        if len <= 4 || !Self::has_vowel(&word[..len - 3]) {
            return;
        }
        if let Some(suffix) = STEP3_SUFFIXES
            .iter()
            .find(|suffix| Self::ends_with(word, suffix))
        {
            Self::rewrite(word, suffix.chars().count(), "");
        }
    }
}

impl Stemmer for RuleStemmer {
    fn stem(&self, word: &str) -> String {
        let mut chars: Vec<char> = word.chars().collect();
        if chars.len() < 3 {
            return word.to_string();
        }

        loop {
            let before = chars.len();
            Self::step1a(&mut chars);
            Self::step1b(&mut chars);
            Self::step2(&mut chars);
            Self::step3(&mut chars);
            if chars.len() == before || chars.len() < 3 {
                break;
            }
        }

        chars.into_iter().collect()
    }

    fn name(&self) -> &'static str {
        "rule"
    }
}

/// Filter that applies a stemmer to every token that is not stopped.
#[derive(Clone)]
pub struct StemFilter {
    stemmer: Arc<dyn Stemmer>,
}

impl std::fmt::Debug for StemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StemFilter")
            .field("stemmer", &self.stemmer.name())
            .finish()
    }
}

impl StemFilter {
    /// Create a new stem filter with the rule stemmer.
    pub fn new() -> Self {
        StemFilter {
            stemmer: Arc::new(RuleStemmer::new()),
        }
    }

    /// Create a stem filter with a custom stemmer.
    pub fn with_stemmer(stemmer: Arc<dyn Stemmer>) -> Self {
        StemFilter { stemmer }
    }
}

impl Default for StemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stemmer = Arc::clone(&self.stemmer);
        Ok(Box::new(tokens.map(move |token| {
            if token.is_stopped() {
                token
            } else {
                let stemmed = stemmer.stem(&token.text);
                token.with_text(stemmed)
            }
        })))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_plurals() {
        let stemmer = RuleStemmer::new();
        assert_eq!(stemmer.stem("caresses"), "caress");
        assert_eq!(stemmer.stem("ponies"), "poni");
        assert_eq!(stemmer.stem("cars"), "car");
        assert_eq!(stemmer.stem("class"), "class");
        assert_eq!(stemmer.stem("bus"), "bus");
    }

    #[test]
    fn test_past_tense_and_participles() {
        let stemmer = RuleStemmer::new();
        assert_eq!(stemmer.stem("hopping"), "hop");
        assert_eq!(stemmer.stem("falling"), "fall");
        assert_eq!(stemmer.stem("jumped"), "jump");
        assert_eq!(stemmer.stem("red"), "red");
        assert_eq!(stemmer.stem("feed"), "feed");
        assert_eq!(stemmer.stem("sing"), "sing");
    }

    #[test]
    fn test_derivational_suffixes() {
        let stemmer = RuleStemmer::new();
        assert_eq!(stemmer.stem("relational"), "relate");
        assert_eq!(stemmer.stem("conditional"), "condition");
        assert_eq!(stemmer.stem("hopefulness"), "hope");
        assert_eq!(stemmer.stem("electric"), "electr");
        assert_eq!(stemmer.stem("quick"), "quick");
    }

    #[test]
    fn test_exposed_suffixes_are_stripped() {
        let stemmer = RuleStemmer::new();
        assert_eq!(stemmer.stem("differences"), "diff");
        assert_eq!(stemmer.stem("differ"), "diff");
        for word in ["differences", "generalizations", "conditionally", "hopefulness", "ponies"] {
            let once = stemmer.stem(word);
            assert_eq!(stemmer.stem(&once), once, "{word}");
        }
    }

    #[test]
    fn test_y_vowel_rule() {
        let stemmer = RuleStemmer::new();
        // "y" after a consonant is a vowel, so "cry" is a valid stem
        assert_eq!(stemmer.stem("crying"), "cry");
        // no vowel left in "th", so the suffix stays
        assert_eq!(stemmer.stem("thing"), "thing");
    }

    #[test]
    fn test_never_shrinks_below_two_chars() {
        let stemmer = RuleStemmer::new();
        assert_eq!(stemmer.stem("fulness"), "fulness");
        assert_eq!(stemmer.stem("ies"), "ies");
        for word in ["eing", "xable", "aing", "ies", "oed"] {
            assert!(stemmer.stem(word).chars().count() >= 2, "{word}");
        }
    }

    #[test]
    fn test_stem_filter() {
        let filter = StemFilter::new();
        let tokens = vec![Token::new("running", 0), Token::new("cats", 1).stop()];
        let result: Vec<_> = filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .collect();
        assert_eq!(result[0].text, "run");
        assert_eq!(result[1].text, "cats");
    }
}
