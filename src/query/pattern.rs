//! Term patterns for multi-term queries
//!
//! Supports:
//! - `*` - matches any sequence of characters
//! - `?` - matches any single character
//! - prefixes
//! - fuzzy terms within a Levenshtein edit distance

use crate::error::HighlightError;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of dictionary terms a fuzzy pattern expands to
pub const DEFAULT_MAX_EXPANSIONS: usize = 50;

/// Maximum number of dictionary terms a wildcard or prefix pattern expands to
pub const MAX_TERM_EXPANSIONS: usize = 1024;

fn default_max_edits() -> u32 {
    2
}

/// A pattern matched against a field's term dictionary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermPattern {
    /// Wildcard pattern using `*` and `?`
    Wildcard(String),
    /// Every term starting with the prefix
    Prefix(String),
    /// Terms within `max_edits` of `term`, sharing its first `prefix_length` characters
    Fuzzy {
        term: String,
        #[serde(default = "default_max_edits")]
        max_edits: u32,
        #[serde(default)]
        prefix_length: usize,
    },
}

impl TermPattern {
    /// Create a fuzzy pattern with the default edit distance of 2
    pub fn fuzzy(term: impl Into<String>) -> Self {
        TermPattern::Fuzzy {
            term: term.into(),
            max_edits: default_max_edits(),
            prefix_length: 0,
        }
    }

    /// Upper bound on the number of terms this pattern expands to
    pub fn max_expansions(&self) -> usize {
        match self {
            TermPattern::Fuzzy { .. } => DEFAULT_MAX_EXPANSIONS,
            TermPattern::Wildcard(_) | TermPattern::Prefix(_) => MAX_TERM_EXPANSIONS,
        }
    }

    /// Extract the literal prefix of the pattern
    ///
    /// Returns the longest prefix before the first wildcard character.
    /// This narrows the range of dictionary terms to scan.
    pub fn literal_prefix(&self) -> &str {
        match self {
            TermPattern::Wildcard(pattern) => {
                let end = pattern.find(['*', '?']).unwrap_or(pattern.len());
                &pattern[..end]
            }
            TermPattern::Prefix(prefix) => prefix,
            TermPattern::Fuzzy {
                term,
                prefix_length,
                ..
            } => {
                let end = term
                    .char_indices()
                    .nth(*prefix_length)
                    .map(|(idx, _)| idx)
                    .unwrap_or(term.len());
                &term[..end]
            }
        }
    }

    /// Compile the pattern into a matcher
    pub fn matcher(&self) -> Result<TermMatcher> {
        Ok(match self {
            TermPattern::Wildcard(pattern) => TermMatcher::Regex(wildcard_to_regex(pattern)?),
            TermPattern::Prefix(prefix) => TermMatcher::Prefix(prefix.clone()),
            TermPattern::Fuzzy {
                term, max_edits, ..
            } => TermMatcher::Fuzzy {
                term: term.clone(),
                prefix: self.literal_prefix().to_string(),
                max_edits: *max_edits as usize,
            },
        })
    }

    /// Apply a normalization (lowercasing) to the pattern text
    pub fn map_text(&self, normalize: impl Fn(&str) -> String) -> Self {
        match self {
            TermPattern::Wildcard(pattern) => TermPattern::Wildcard(normalize(pattern)),
            TermPattern::Prefix(prefix) => TermPattern::Prefix(normalize(prefix)),
            TermPattern::Fuzzy {
                term,
                max_edits,
                prefix_length,
            } => TermPattern::Fuzzy {
                term: normalize(term),
                max_edits: *max_edits,
                prefix_length: *prefix_length,
            },
        }
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Wildcard(pattern) => write!(f, "{}", pattern),
            TermPattern::Prefix(prefix) => write!(f, "{}*", prefix),
            TermPattern::Fuzzy {
                term, max_edits, ..
            } => write!(f, "{}~{}", term, max_edits),
        }
    }
}

/// Compiled form of a [`TermPattern`]
#[derive(Clone, Debug)]
pub enum TermMatcher {
    Regex(Regex),
    Prefix(String),
    Fuzzy {
        term: String,
        prefix: String,
        max_edits: usize,
    },
}

impl TermMatcher {
    /// Check whether a dictionary term satisfies the pattern
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            TermMatcher::Regex(regex) => regex.is_match(candidate),
            TermMatcher::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            TermMatcher::Fuzzy {
                term,
                prefix,
                max_edits,
            } => {
                if !candidate.starts_with(prefix.as_str()) {
                    return false;
                }
                // Length difference is a lower bound on the distance
                let len_diff = term.chars().count().abs_diff(candidate.chars().count());
                len_diff <= *max_edits && levenshtein_distance(term, candidate) <= *max_edits
            }
        }
    }
}

/// Convert a wildcard pattern to an anchored regex
///
/// `*` and `?` are the only metacharacters; every literal run is escaped.
pub fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let mut regex_pattern = String::with_capacity(pattern.len() + 2);
    regex_pattern.push('^');

    let mut literal = String::new();
    for ch in pattern.chars() {
        let wildcard = match ch {
            '*' => ".*",
            '?' => ".",
            _ => {
                literal.push(ch);
                continue;
            }
        };
        regex_pattern.push_str(&regex::escape(&literal));
        literal.clear();
        regex_pattern.push_str(wildcard);
    }
    regex_pattern.push_str(&regex::escape(&literal));

    regex_pattern.push('$');

    Regex::new(&regex_pattern).map_err(|e| {
        HighlightError::QueryExecution(format!("Invalid wildcard pattern '{}': {}", pattern, e))
    })
}

/// Calculate Levenshtein distance between two strings
///
/// Uses dynamic programming with O(m*n) time and O(min(m,n)) space.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    // Use smaller string for columns to minimize space
    let (shorter, longer) = if s1_chars.len() <= s2_chars.len() {
        (&s1_chars, &s2_chars)
    } else {
        (&s2_chars, &s1_chars)
    };

    let mut prev_row: Vec<usize> = (0..=shorter.len()).collect();
    let mut curr_row = vec![0; shorter.len() + 1];

    for (i, long_ch) in longer.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, short_ch) in shorter.iter().enumerate() {
            let cost = usize::from(long_ch != short_ch);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[shorter.len()]
}
