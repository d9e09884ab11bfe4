//! Edit distance used by fuzzy matching and the `levenshtein` template helper.
//!
//! The distance is the optimal-string-alignment flavour of Damerau-Levenshtein:
//! insertions, deletions, substitutions and adjacent transpositions each cost
//! one edit. Strings are compared by `char`, not by byte.

use std::cmp::min;

/// Calculate the Damerau-Levenshtein distance between two strings.
#[allow(clippy::needless_range_loop)]
pub fn damerau_levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    distance_chars(&s1_chars, &s2_chars)
}

#[allow(clippy::needless_range_loop)]
fn distance_chars(s1: &[char], s2: &[char]) -> usize {
    let len1 = s1.len();
    let len2 = s2.len();

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for i in 0..=len1 {
        matrix[i][0] = i;
    }
    for j in 0..=len2 {
        matrix[0][j] = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = if s1[i - 1] == s2[j - 1] { 0 } else { 1 };

            matrix[i][j] = min(
                min(
                    matrix[i - 1][j] + 1, // deletion
                    matrix[i][j - 1] + 1, // insertion
                ),
                matrix[i - 1][j - 1] + cost, // substitution
            );

            if i > 1 && j > 1 && s1[i - 1] == s2[j - 2] && s1[i - 2] == s2[j - 1] {
                matrix[i][j] = min(matrix[i][j], matrix[i - 2][j - 2] + 1); // transposition
            }
        }
    }

    matrix[len1][len2]
}

/// Matches many candidates against one lowercased query.
///
/// The query is decoded once; candidates are lowercased before comparison.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    query_chars: Vec<char>,
}

impl FuzzyMatcher {
    /// Create a matcher for `query`, compared case-insensitively.
    pub fn new(query: &str) -> Self {
        FuzzyMatcher {
            query_chars: query.to_lowercase().chars().collect(),
        }
    }

    /// Distance between the query and a lowercased `candidate`.
    pub fn distance(&self, candidate: &str) -> usize {
        let candidate_chars: Vec<char> = candidate.to_lowercase().chars().collect();
        distance_chars(&candidate_chars, &self.query_chars)
    }

    /// Distance to `candidate` if it is at most `max_distance` edits away.
    pub fn within(&self, candidate: &str, max_distance: usize) -> Option<usize> {
        let candidate_len = candidate.chars().count();
        if candidate_len.abs_diff(self.query_chars.len()) > max_distance {
            return None;
        }
        let distance = self.distance(candidate);
        (distance <= max_distance).then_some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damerau_levenshtein_distance() {
        assert_eq!(damerau_levenshtein_distance("", ""), 0);
        assert_eq!(damerau_levenshtein_distance("", "abc"), 3);
        assert_eq!(damerau_levenshtein_distance("ab", "ba"), 1);
        assert_eq!(damerau_levenshtein_distance("search", "serach"), 1);
        assert_eq!(damerau_levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(damerau_levenshtein_distance("ca", "abc"), 3);
    }

    #[test]
    fn test_unicode_is_compared_by_char() {
        assert_eq!(damerau_levenshtein_distance("café", "cafe"), 1);
        assert_eq!(damerau_levenshtein_distance("日本", "本日"), 1);
    }

    #[test]
    fn test_fuzzy_matcher() {
        let matcher = FuzzyMatcher::new("Quick");
        assert_eq!(matcher.distance("QUICK"), 0);
        assert_eq!(matcher.within("quikc", 1), Some(1));
        assert_eq!(matcher.within("quack", 0), None);
        assert_eq!(matcher.within("q", 2), None);
    }

    #[test]
    fn test_common_typos() {
        let common_typos = vec![
            ("the", "teh"),
            ("search", "serach"),
            ("hello", "helo"),
            ("world", "wrold"),
            ("quick", "quikc"),
        ];

        for (correct, typo) in common_typos {
            let distance = damerau_levenshtein_distance(correct, typo);
            assert_eq!(distance, 1, "Distance too high for {correct} -> {typo}");
        }
    }
}
