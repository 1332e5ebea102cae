//! Field type definitions
//!
//! Defines how each field's values are analyzed, and therefore whether and
//! how they can be highlighted.

use serde::{Deserialize, Serialize};

/// Field data type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Full-text field
    ///
    /// Text fields are analyzed (tokenized, lowercased, optionally stemmed)
    /// and are the usual highlighting targets.
    Text {
        /// Analyzer to use for indexing
        #[serde(default = "default_analyzer")]
        analyzer: String,
        /// Analyzer to use for query text (if different from index analyzer)
        #[serde(default)]
        search_analyzer: Option<String>,
    },

    /// Exact match keyword field
    ///
    /// The entire value is a single term; a match highlights the whole value.
    Keyword,

    /// 64-bit signed integer
    Long,

    /// 64-bit floating point
    Double,

    /// Boolean value
    Boolean,

    /// Date/time field
    Date,
}

fn default_analyzer() -> String {
    "standard".to_string()
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::text()
    }
}

impl FieldType {
    /// Create a text field with default settings
    pub fn text() -> Self {
        FieldType::Text {
            analyzer: default_analyzer(),
            search_analyzer: None,
        }
    }

    /// Create a text field with a specific analyzer
    pub fn text_with_analyzer(analyzer: impl Into<String>) -> Self {
        FieldType::Text {
            analyzer: analyzer.into(),
            search_analyzer: None,
        }
    }

    /// Check if this field type supports full-text queries
    pub fn supports_fulltext(&self) -> bool {
        matches!(self, FieldType::Text { .. })
    }

    /// Name of the analyzer used when indexing values of this type
    ///
    /// `None` for types that have no index-time analysis and therefore
    /// cannot be highlighted.
    pub fn index_analyzer(&self) -> Option<&str> {
        match self {
            FieldType::Text { analyzer, .. } => Some(analyzer),
            FieldType::Keyword => Some("keyword"),
            FieldType::Long | FieldType::Double | FieldType::Boolean | FieldType::Date => None,
        }
    }

    /// Name of the analyzer used for query text against this type
    pub fn search_analyzer(&self) -> Option<&str> {
        match self {
            FieldType::Text {
                search_analyzer: Some(name),
                ..
            } => Some(name),
            _ => self.index_analyzer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_text() {
        let field = FieldType::text();
        assert!(field.supports_fulltext());
        assert_eq!(field.index_analyzer(), Some("standard"));
        assert_eq!(field.search_analyzer(), Some("standard"));
    }

    #[test]
    fn test_search_analyzer_override() {
        let field = FieldType::Text {
            analyzer: "english".to_string(),
            search_analyzer: Some("standard".to_string()),
        };
        assert_eq!(field.index_analyzer(), Some("english"));
        assert_eq!(field.search_analyzer(), Some("standard"));
    }

    #[test]
    fn test_non_text_types_have_no_analyzer() {
        assert_eq!(FieldType::Keyword.index_analyzer(), Some("keyword"));
        assert_eq!(FieldType::Long.index_analyzer(), None);
        assert_eq!(FieldType::Date.search_analyzer(), None);
    }

    #[test]
    fn test_serialization() {
        let field = FieldType::text_with_analyzer("english");
        let json = serde_json::to_string(&field).unwrap();
        // Externally tagged enum format: {"text":{"analyzer":"..."}}
        assert!(json.contains("\"text\""));
        assert!(json.contains("\"analyzer\":\"english\""));

        let deserialized: FieldType = serde_json::from_str(&json).unwrap();
        assert_eq!(field, deserialized);

        let keyword: FieldType = serde_json::from_str("\"keyword\"").unwrap();
        assert_eq!(keyword, FieldType::Keyword);
    }
}
