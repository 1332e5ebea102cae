//! Index mapping definitions
//!
//! Mappings declare a type per field name; the highlighter resolves each
//! field's analyzer through them.

use super::field_type::FieldType;
use super::AnalyzerLookup;
use crate::config::TokenizerConfig;
use crate::tokenizer::Analyzer;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Dynamic mapping behavior for unmapped fields
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynamicMapping {
    /// Treat unmapped fields as default text fields (default)
    #[default]
    True,
    /// Ignore unmapped fields
    False,
    /// Unmapped fields are an error for the caller; they are never analyzed
    Strict,
}

impl DynamicMapping {
    /// Check if new fields should be automatically mapped
    pub fn should_auto_map(&self) -> bool {
        matches!(self, DynamicMapping::True)
    }

    /// Check if unmapped fields should cause an error
    pub fn should_reject_unmapped(&self) -> bool {
        matches!(self, DynamicMapping::Strict)
    }
}

/// Field mapping configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field is stored (only stored fields can be rendered)
    #[serde(default = "default_true")]
    pub store: bool,
}

fn default_true() -> bool {
    true
}

impl FieldMapping {
    /// Create a new field mapping with the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            store: true,
        }
    }

    /// Create a text field mapping
    pub fn text() -> Self {
        Self::new(FieldType::text())
    }

    /// Create a text field mapping with a named analyzer
    pub fn text_with_analyzer(analyzer: impl Into<String>) -> Self {
        Self::new(FieldType::text_with_analyzer(analyzer))
    }

    /// Create a keyword field mapping
    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    /// Create a long field mapping
    pub fn long() -> Self {
        Self::new(FieldType::Long)
    }

    /// Set whether the field value is stored
    pub fn with_store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }
}

/// Index mapping (schema) definition
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndexMapping {
    /// Field mappings
    #[serde(default)]
    pub properties: HashMap<String, FieldMapping>,

    /// Dynamic mapping behavior
    #[serde(default)]
    pub dynamic: DynamicMapping,
}

impl IndexMapping {
    /// Create a new empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping with strict mode
    pub fn strict() -> Self {
        Self {
            dynamic: DynamicMapping::Strict,
            ..Default::default()
        }
    }

    /// Load a mapping from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Add a field mapping
    pub fn field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.properties.insert(name.into(), mapping);
        self
    }

    /// Set dynamic mapping behavior
    pub fn with_dynamic(mut self, dynamic: DynamicMapping) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Get a field mapping by name
    pub fn get_field(&self, name: &str) -> Option<&FieldMapping> {
        self.properties.get(name)
    }

    /// Check if a field exists
    pub fn has_field(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Effective type of a field, taking dynamic mapping into account
    pub fn resolve_type(&self, name: &str) -> Option<FieldType> {
        match self.properties.get(name) {
            Some(mapping) if mapping.store => Some(mapping.field_type.clone()),
            Some(_) => None,
            None if self.dynamic.should_auto_map() => Some(FieldType::text()),
            None => None,
        }
    }
}

/// Cache key for the analysis applied to dynamically mapped fields
const DEFAULT_ANALYZER_KEY: &str = "_default";

/// Schema with analyzer resolution and caching
///
/// Analyzers are built once per analyzer name and shared between fields.
pub struct Schema {
    mapping: IndexMapping,
    /// Fallback analysis for unmapped fields and for unknown analyzer names
    default_config: TokenizerConfig,
    analyzers: RwLock<HashMap<String, Arc<Analyzer>>>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("mapping", &self.mapping)
            .field("default_config", &self.default_config)
            .finish()
    }
}

impl Schema {
    /// Create a schema over a mapping
    pub fn new(mapping: IndexMapping, default_config: TokenizerConfig) -> Self {
        Self {
            mapping,
            default_config,
            analyzers: RwLock::new(HashMap::new()),
        }
    }

    /// Dynamic schema: every field is default text
    pub fn dynamic(default_config: TokenizerConfig) -> Self {
        Self::new(IndexMapping::new(), default_config)
    }

    /// Get the underlying mapping
    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    fn analyzer_named(&self, name: &str) -> Arc<Analyzer> {
        if let Some(cached) = self.analyzers.read().get(name) {
            return cached.clone();
        }

        let analyzer = if name == DEFAULT_ANALYZER_KEY {
            Analyzer::text(&self.default_config)
        } else {
            Analyzer::by_name(name).unwrap_or_else(|| {
                tracing::warn!(
                    "unknown analyzer '{}', falling back to the default analysis",
                    name
                );
                Analyzer::text(&self.default_config)
            })
        };
        let analyzer = Arc::new(analyzer);
        self.analyzers
            .write()
            .entry(name.to_string())
            .or_insert(analyzer)
            .clone()
    }

    fn analyzer_for_type(&self, field_type: &FieldType, search: bool) -> Option<Arc<Analyzer>> {
        let name = if search {
            field_type.search_analyzer()
        } else {
            field_type.index_analyzer()
        }?;
        Some(self.analyzer_named(name))
    }
}

impl AnalyzerLookup for Schema {
    fn index_analyzer(&self, field: &str) -> Option<Arc<Analyzer>> {
        if !self.mapping.has_field(field) && self.mapping.dynamic.should_auto_map() {
            return Some(self.analyzer_named(DEFAULT_ANALYZER_KEY));
        }
        let field_type = self.mapping.resolve_type(field)?;
        self.analyzer_for_type(&field_type, false)
    }

    fn search_analyzer(&self, field: &str) -> Option<Arc<Analyzer>> {
        if !self.mapping.has_field(field) && self.mapping.dynamic.should_auto_map() {
            return Some(self.analyzer_named(DEFAULT_ANALYZER_KEY));
        }
        let field_type = self.mapping.resolve_type(field)?;
        self.analyzer_for_type(&field_type, true)
    }
}
