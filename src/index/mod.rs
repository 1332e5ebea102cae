//! Analysis engine interfaces
//!
//! The highlighter talks to its text-analysis engine only through the traits
//! in this module:
//! - [`AnalysisEngine`] builds an ephemeral per-document index
//! - [`DocumentIndex`] executes a rewritten query and returns a [`MatchTree`]
//! - [`Spans`] iterates the match positions of one span query
//! - [`SpanCollector`] receives every leaf term occurrence of a match
//!
//! [`MemoryIndex`] is the in-process implementation.

mod memory;

pub use memory::{MemoryEngine, MemoryIndex};

use crate::query::RewrittenQuery;
use crate::tokenizer::Analyzer;
use crate::Result;
use std::sync::Arc;

/// Sentinel returned once a span iterator has no more positions in a document
pub const NO_MORE_POSITIONS: i32 = i32::MAX;

/// Sentinel returned once an iterator has no more documents
pub const NO_MORE_DOCS: i32 = i32::MAX;

/// Start position of a span iterator that has not been positioned yet
pub const UNPOSITIONED: i32 = -1;

/// One field value to index, with the analyzer for its field
#[derive(Clone, Debug)]
pub struct FieldText {
    pub field: String,
    pub text: String,
    pub analyzer: Arc<Analyzer>,
}

impl FieldText {
    pub fn new(field: impl Into<String>, text: impl Into<String>, analyzer: Arc<Analyzer>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            analyzer,
        }
    }
}

/// A document with stored, possibly multi-valued fields
pub trait StoredDocument {
    /// Document identifier
    fn id(&self) -> &str;

    /// Every (field, value) pair in stored order
    fn fields(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;

    /// Stored values of one field, in original order
    fn values(&self, field: &str) -> Vec<&str> {
        self.fields()
            .filter(|(name, _)| *name == field)
            .map(|(_, value)| value)
            .collect()
    }
}

/// Builds the ephemeral index a document is highlighted against
pub trait AnalysisEngine: Send + Sync {
    type Index: DocumentIndex;

    /// Index every value; repeated fields form a multi-valued field
    fn build_index(&self, values: &[FieldText]) -> Result<Self::Index>;
}

/// A single-document index that answers rewritten queries
pub trait DocumentIndex {
    /// Execute a query
    ///
    /// Returns `None` when the document does not match, otherwise the match
    /// tree positioned on the matching document.
    fn search(&self, query: &RewrittenQuery) -> Result<Option<MatchTree>>;
}

/// One term occurrence reported by a span match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafHit<'a> {
    pub field: &'a str,
    pub term: &'a str,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
}

/// Receives the leaf term occurrences of span matches
pub trait SpanCollector {
    fn collect_leaf(&mut self, hit: LeafHit<'_>);
}

/// Position iterator over the matches of one span query
///
/// Iteration follows the usual doc-then-position protocol: position the
/// iterator on a document with [`Spans::advance`], then step through its
/// matches with [`Spans::next_start_position`] until it returns
/// [`NO_MORE_POSITIONS`].
pub trait Spans {
    /// Current document, [`UNPOSITIONED`] before the first advance
    fn doc_id(&self) -> i32;

    /// Move to the first document at or after `target`
    fn advance(&mut self, target: i32) -> Result<i32>;

    /// Move to the next match in the current document
    fn next_start_position(&mut self) -> Result<i32>;

    /// Start of the current match, [`UNPOSITIONED`] before the first call
    /// to `next_start_position`
    fn start_position(&self) -> i32;

    /// End of the current match (exclusive)
    fn end_position(&self) -> i32;

    /// Report every leaf term occurrence of the current match
    fn collect(&mut self, collector: &mut dyn SpanCollector) -> Result<()>;
}

/// Result of executing a rewritten query against a document
///
/// Mirrors the scorer tree of a matching query: span iterators at the
/// leaves, composite nodes for boolean and disjunction structure.
pub enum MatchTree {
    /// A span query's iterator
    Spans(Box<dyn Spans>),
    /// Matching clauses of a boolean query; prohibited clauses are absent
    Boolean { doc: i32, children: Vec<MatchTree> },
    /// Matching disjuncts of a disjunction-max query
    DisjunctionMax { doc: i32, children: Vec<MatchTree> },
    /// A boolean query scored in bulk; its clauses are not reachable
    Bulk { doc: i32 },
    /// A match that carries no position information
    Opaque { doc: i32 },
}

impl MatchTree {
    /// Document this match is positioned on
    pub fn doc_id(&self) -> i32 {
        match self {
            MatchTree::Spans(spans) => spans.doc_id(),
            MatchTree::Boolean { doc, .. }
            | MatchTree::DisjunctionMax { doc, .. }
            | MatchTree::Bulk { doc }
            | MatchTree::Opaque { doc } => *doc,
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            MatchTree::Spans(_) => "spans",
            MatchTree::Boolean { .. } => "boolean",
            MatchTree::DisjunctionMax { .. } => "disjunction_max",
            MatchTree::Bulk { .. } => "bulk",
            MatchTree::Opaque { .. } => "opaque",
        }
    }
}

impl std::fmt::Debug for MatchTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTree::Spans(spans) => f
                .debug_struct("Spans")
                .field("doc", &spans.doc_id())
                .field("start", &spans.start_position())
                .finish(),
            MatchTree::Boolean { doc, children } | MatchTree::DisjunctionMax { doc, children } => f
                .debug_struct(self.kind())
                .field("doc", doc)
                .field("children", children)
                .finish(),
            MatchTree::Bulk { doc } | MatchTree::Opaque { doc } => {
                f.debug_struct(self.kind()).field("doc", doc).finish()
            }
        }
    }
}
