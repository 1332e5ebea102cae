//! Schema and field type system
//!
//! Field types decide which analyzer a field is indexed and queried with:
//! - Field types (Text, Keyword, Long, Double, Boolean, Date)
//! - Index mappings (field configuration, dynamic behavior)
//! - Analyzer resolution with a per-name cache

mod field_type;
mod mapping;

pub use field_type::FieldType;
pub use mapping::{DynamicMapping, FieldMapping, IndexMapping, Schema};

use crate::tokenizer::Analyzer;
use std::sync::Arc;

/// Resolves the analyzer for a field name
///
/// `None` means the field is not analyzed and cannot be highlighted.
pub trait AnalyzerLookup: Send + Sync {
    /// Analyzer used to index stored values of the field
    fn index_analyzer(&self, field: &str) -> Option<Arc<Analyzer>>;

    /// Analyzer used for query text against the field
    fn search_analyzer(&self, field: &str) -> Option<Arc<Analyzer>> {
        self.index_analyzer(field)
    }
}
