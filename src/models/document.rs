use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::index::StoredDocument;
use crate::Result;

/// Unique document identifier
pub type DocumentId = String;

/// Document with stored, possibly repeated fields
///
/// Serialized as `{"id": "1", "fields": [["title", "..."], ["tags", "a"], ["tags", "b"]]}`;
/// a field name that appears more than once is a multi-valued field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub fields: Vec<(String, String)>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Append a value; repeating a name adds another value to that field
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(name, value);
        self
    }

    /// Load a JSON array of documents
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Document>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl StoredDocument for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.fields
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str())),
        )
    }
}
