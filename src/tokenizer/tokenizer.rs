use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;

/// A token with its position and character offsets in the source text
///
/// `start` is inclusive and `end` exclusive; both count Unicode scalar
/// values, not bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub term: String,
    pub position: u32,
    pub start: usize,
    pub end: usize,
}

/// Text tokenizer with stemming and stopword removal
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<String>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("config", &self.config)
            .finish()
    }
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        let (algorithm, stopword_language) =
            language_support(&config.language).unwrap_or_else(|| {
                warn!(language = %config.language, "unsupported language, using english");
                (Algorithm::English, LANGUAGE::English)
            });

        let stemmer = if config.stem {
            Some(Stemmer::create(algorithm))
        } else {
            None
        };

        let stopwords = if config.remove_stopwords {
            get(stopword_language)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Self {
            config: config.clone(),
            stemmer,
            stopwords,
        }
    }

    /// Get the configuration this tokenizer was built from
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize text into a vector of terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.term).collect()
    }

    /// Tokenize text, keeping positions and character offsets
    ///
    /// Words removed by the length or stopword filters still consume a
    /// position, so a phrase containing a stopword yields a position hole.
    pub fn analyze(&self, text: &str) -> Vec<AnalyzedToken> {
        self.analyze_value(text).0
    }

    /// Like [`analyze`](Self::analyze), also returning the number of
    /// positions the text consumed, filtered trailing words included
    pub fn analyze_value(&self, text: &str) -> (Vec<AnalyzedToken>, u32) {
        let mut tokens = Vec::new();
        let mut pos = 0u32;
        let mut byte_cursor = 0usize;
        let mut char_cursor = 0usize;

        for (byte_idx, word) in text.unicode_word_indices() {
            char_cursor += text[byte_cursor..byte_idx].chars().count();
            let start = char_cursor;
            let end = start + word.chars().count();
            byte_cursor = byte_idx + word.len();
            char_cursor = end;

            let mut token = word.to_string();

            if self.config.lowercase {
                token = token.to_lowercase();
            }

            // Check length constraints
            let length = token.chars().count();
            if length < self.config.min_token_length || length > self.config.max_token_length {
                pos += 1;
                continue;
            }

            // Check stopwords (after lowercasing)
            if self.stopwords.contains(&token) {
                pos += 1;
                continue;
            }

            if let Some(stemmer) = &self.stemmer {
                token = stemmer.stem(&token).to_string();
            }

            tokens.push(AnalyzedToken {
                term: token,
                position: pos,
                start,
                end,
            });
            pos += 1;
        }

        (tokens, pos)
    }

    /// Normalize a single query term the way indexed terms are normalized
    ///
    /// Used for pattern terms (wildcards, prefixes, fuzzy terms), which are
    /// lowercased but not stemmed.
    pub fn normalize_pattern(&self, term: &str) -> String {
        if self.config.lowercase {
            term.to_lowercase()
        } else {
            term.to_string()
        }
    }
}

/// Stemming algorithm and stopword list for a language name
pub(crate) fn language_support(language: &str) -> Option<(Algorithm, LANGUAGE)> {
    let support = match language.to_lowercase().as_str() {
        "english" | "en" => (Algorithm::English, LANGUAGE::English),
        "french" | "fr" => (Algorithm::French, LANGUAGE::French),
        "german" | "de" => (Algorithm::German, LANGUAGE::German),
        "spanish" | "es" => (Algorithm::Spanish, LANGUAGE::Spanish),
        "italian" | "it" => (Algorithm::Italian, LANGUAGE::Italian),
        "portuguese" | "pt" => (Algorithm::Portuguese, LANGUAGE::Portuguese),
        "dutch" | "nl" => (Algorithm::Dutch, LANGUAGE::Dutch),
        "russian" | "ru" => (Algorithm::Russian, LANGUAGE::Russian),
        "swedish" | "sv" => (Algorithm::Swedish, LANGUAGE::Swedish),
        _ => return None,
    };
    Some(support)
}
