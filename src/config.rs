use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::highlight::OverlapPolicy;
use crate::query::types::MatchOperator;
use crate::Result;

/// Default tag inserted before a highlighted region
pub const DEFAULT_PRE_TAG: &str = "<em>";

/// Default tag inserted after a highlighted region
pub const DEFAULT_POST_TAG: &str = "</em>";

/// Highlighter configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Tag inserted before each highlighted region
    pub pre_tag: String,
    /// Tag inserted after each highlighted region
    pub post_tag: String,
    /// Field searched by unqualified terms in query strings
    pub default_field: String,
    /// Operator between adjacent query-string clauses
    pub default_operator: MatchOperator,
    /// Upper bound on auxiliary highlight queries read from a request
    pub max_highlight_queries: usize,
    /// Character gap between successive values of a multi-valued field
    pub offset_gap: usize,
    /// Position gap between successive values of a multi-valued field
    pub position_increment_gap: u32,
    /// What to do with offsets that straddle a value boundary
    pub overlap_policy: OverlapPolicy,
    /// Analysis used for fields the schema does not know about
    pub tokenizer_config: TokenizerConfig,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            pre_tag: DEFAULT_PRE_TAG.to_string(),
            post_tag: DEFAULT_POST_TAG.to_string(),
            default_field: "text".to_string(),
            default_operator: MatchOperator::Or,
            max_highlight_queries: 100,
            offset_gap: 1,
            position_increment_gap: 0,
            overlap_policy: OverlapPolicy::Clamp,
            tokenizer_config: TokenizerConfig::standard(),
        }
    }
}

impl HighlightConfig {
    /// Load a configuration from a JSON file; missing keys take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the default highlight tags
    pub fn with_tags(mut self, pre_tag: impl Into<String>, post_tag: impl Into<String>) -> Self {
        self.pre_tag = pre_tag.into();
        self.post_tag = post_tag.into();
        self
    }

    /// Set the default field for query strings
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    /// Set the default query-string operator
    pub fn with_default_operator(mut self, operator: MatchOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Set the position gap between values of a multi-valued field
    pub fn with_position_increment_gap(mut self, gap: u32) -> Self {
        self.position_increment_gap = gap;
        self
    }

    /// Set the overlap policy used when rendering
    pub fn with_overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }
}

/// Tokenizer configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
    pub language: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: true,
            stem: true,
            min_token_length: 2,
            max_token_length: 50,
            language: "english".to_string(),
        }
    }
}

impl TokenizerConfig {
    /// Lowercasing only; every word is kept
    pub fn standard() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: false,
            stem: false,
            min_token_length: 1,
            max_token_length: 255,
            language: "english".to_string(),
        }
    }

    /// Lowercasing, stopword removal and stemming
    pub fn english() -> Self {
        Self::default()
    }

    /// Lowercasing and a two-character minimum
    pub fn simple() -> Self {
        Self {
            min_token_length: 2,
            ..Self::standard()
        }
    }

    /// Set the language used for stopwords and stemming
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Resolve a named analyzer preset
    pub fn for_analyzer(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "english" => Some(Self::english()),
            "simple" => Some(Self::simple()),
            _ => None,
        }
    }
}
