//! Multi-query span highlighting
//!
//! A request carries any number of highlight queries, each with its own
//! tags. Every query becomes a [`HighlightingTask`] whose priority is its
//! position in the request. Per document, all tasks run against one
//! ephemeral index; their offsets are merged per field, with the lower
//! priority number winning overlaps, and rendered back onto the stored
//! values.
//!
//! ```
//! use std::sync::Arc;
//! use spanlight::config::{HighlightConfig, TokenizerConfig};
//! use spanlight::highlight::{HighlightRequest, SpanHighlighter};
//! use spanlight::models::Document;
//! use spanlight::schema::Schema;
//!
//! let config = HighlightConfig::default().with_tags("[", "]");
//! let schema = Arc::new(Schema::dynamic(TokenizerConfig::standard()));
//! let highlighter = SpanHighlighter::new(config, schema);
//!
//! let doc = Document::new("1").with_field("text", "what is my banana doing over there?");
//! let primary = highlighter.parse_query("banana").unwrap();
//! let request = highlighter.request().with_field_list("text");
//!
//! let response = highlighter.highlight(&[doc], &primary, &request).unwrap();
//! assert_eq!(
//!     response.get("1").unwrap()["text"],
//!     vec!["what is my [banana] doing over there?"]
//! );
//! ```

mod document;
pub mod extractor;
mod fields;
mod offsets;
mod renderer;
mod task;

pub use document::DocumentHighlighter;
pub use extractor::{collect_spans, extract_spans};
pub use fields::{parse_field_list, FieldPattern};
pub use offsets::{merge_offsets, Offset, OffsetCollector, TaskScopedCollector};
pub use renderer::{HighlightRenderer, OverlapPolicy};
pub use task::HighlightingTask;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HighlightConfig;
use crate::error::HighlightError;
use crate::index::{AnalysisEngine, MemoryEngine, StoredDocument};
use crate::metrics::HighlightMetrics;
use crate::query::{Query, QueryRewriter, QueryStringParser, RewrittenQuery};
use crate::schema::AnalyzerLookup;
use crate::Result;

/// One auxiliary highlight query with optional tags of its own
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightQuery {
    /// Query string
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tag: Option<String>,
}

impl HighlightQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            pre_tag: None,
            post_tag: None,
        }
    }

    pub fn with_tags(mut self, pre_tag: impl Into<String>, post_tag: impl Into<String>) -> Self {
        self.pre_tag = Some(pre_tag.into());
        self.post_tag = Some(post_tag.into());
        self
    }
}

/// What to highlight and how
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// Field names or patterns (`title`, `body_*`, `*`)
    pub fields: Vec<String>,
    pub pre_tag: String,
    pub post_tag: String,
    /// Auxiliary queries; when empty the primary query is highlighted
    #[serde(default)]
    pub queries: Vec<HighlightQuery>,
}

impl HighlightRequest {
    pub fn new(pre_tag: impl Into<String>, post_tag: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            pre_tag: pre_tag.into(),
            post_tag: post_tag.into(),
            queries: Vec::new(),
        }
    }

    /// Add fields from a whitespace or comma separated list
    pub fn with_field_list(mut self, list: &str) -> Self {
        self.fields.extend(parse_field_list(list));
        self
    }

    pub fn with_query(mut self, query: HighlightQuery) -> Self {
        self.queries.push(query);
        self
    }
}

/// A highlight query that did not become a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectedQuery {
    /// Position of the query in the request
    pub index: usize,
    pub query: String,
    pub error: String,
}

/// Tasks built from a request
#[derive(Debug, Default)]
pub struct PreparedTasks {
    pub tasks: Vec<Arc<HighlightingTask>>,
    pub rejected: Vec<RejectedQuery>,
}

/// Highlights of one document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentHighlights {
    pub id: String,
    pub fields: BTreeMap<String, Vec<String>>,
}

/// Highlights of every requested document, in request order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightResponse {
    pub highlighting: Vec<DocumentHighlights>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedQuery>,
}

impl HighlightResponse {
    /// Field highlights of a document, if it was part of the request
    pub fn get(&self, id: &str) -> Option<&BTreeMap<String, Vec<String>>> {
        self.highlighting
            .iter()
            .find(|doc| doc.id == id)
            .map(|doc| &doc.fields)
    }
}

/// Request-level entry point: parses and rewrites highlight queries, then
/// highlights documents one at a time
pub struct SpanHighlighter<E: AnalysisEngine = MemoryEngine> {
    config: HighlightConfig,
    analyzers: Arc<dyn AnalyzerLookup>,
    engine: E,
    rewriter: QueryRewriter,
    metrics: Option<HighlightMetrics>,
}

impl SpanHighlighter<MemoryEngine> {
    /// Highlighter backed by the in-memory index
    pub fn new(config: HighlightConfig, analyzers: Arc<dyn AnalyzerLookup>) -> Self {
        let engine = MemoryEngine::from_config(&config);
        Self::with_engine(config, analyzers, engine)
    }
}

impl<E: AnalysisEngine + Clone> SpanHighlighter<E> {
    pub fn with_engine(config: HighlightConfig, analyzers: Arc<dyn AnalyzerLookup>, engine: E) -> Self {
        Self {
            config,
            analyzers,
            engine,
            rewriter: QueryRewriter::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: HighlightMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Empty request carrying the configured default tags
    pub fn request(&self) -> HighlightRequest {
        HighlightRequest::new(&self.config.pre_tag, &self.config.post_tag)
    }

    /// Parse a query string with the configured default field and operator
    pub fn parse_query(&self, input: &str) -> Result<Query> {
        QueryStringParser::new(input, self.analyzers.as_ref())?
            .with_default_field(&self.config.default_field)
            .with_default_operator(self.config.default_operator)
            .parse()
    }

    fn parse_and_rewrite(&self, input: &str) -> Result<RewrittenQuery> {
        self.rewriter.rewrite(&self.parse_query(input)?)
    }

    /// Build the request's tasks
    ///
    /// Each auxiliary query becomes a task whose priority is its position in
    /// the request. Queries that fail to parse or rewrite are reported in
    /// `rejected` and the rest go ahead. Without auxiliary queries the
    /// primary query is the only task.
    pub fn prepare(&self, request: &HighlightRequest, primary: &Query) -> PreparedTasks {
        let mut prepared = PreparedTasks::default();
        let limit = self.config.max_highlight_queries;
        if request.queries.len() > limit {
            warn!(
                requested = request.queries.len(),
                limit, "ignoring highlight queries beyond the limit"
            );
        }

        for (index, hl_query) in request.queries.iter().take(limit).enumerate() {
            let pre_tag = hl_query.pre_tag.as_deref().unwrap_or(&request.pre_tag);
            let post_tag = hl_query.post_tag.as_deref().unwrap_or(&request.post_tag);

            match self.parse_and_rewrite(&hl_query.query) {
                Ok(rewritten) => {
                    debug!(index, query = %hl_query.query, rewritten = %rewritten, "highlight task ready");
                    prepared.tasks.push(Arc::new(HighlightingTask::new(
                        index as i32,
                        rewritten,
                        pre_tag,
                        post_tag,
                    )));
                }
                Err(err) => self.reject(&mut prepared, index, &hl_query.query, err),
            }
        }

        if request.queries.is_empty() {
            match self.rewriter.rewrite(primary) {
                Ok(rewritten) => prepared.tasks.push(Arc::new(HighlightingTask::new(
                    0,
                    rewritten,
                    &request.pre_tag,
                    &request.post_tag,
                ))),
                Err(err) => self.reject(&mut prepared, 0, &primary.to_string(), err),
            }
        }

        prepared
    }

    fn reject(&self, prepared: &mut PreparedTasks, index: usize, query: &str, err: HighlightError) {
        warn!(index, query, error = %err, "highlight query rejected");
        if let Some(metrics) = &self.metrics {
            metrics.record_rejected_query();
        }
        prepared.rejected.push(RejectedQuery {
            index,
            query: query.to_string(),
            error: err.to_string(),
        });
    }

    /// Per-document highlighter for a request's fields and tasks
    ///
    /// An empty field list highlights the configured default field.
    pub fn document_highlighter(
        &self,
        request: &HighlightRequest,
        tasks: Vec<Arc<HighlightingTask>>,
    ) -> Result<DocumentHighlighter<E>> {
        let fields = if request.fields.is_empty() {
            vec![FieldPattern::Exact(self.config.default_field.clone())]
        } else {
            request
                .fields
                .iter()
                .map(|name| FieldPattern::parse(name))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| HighlightError::InvalidRequest(format!("bad field pattern: {}", e)))?
        };

        let highlighter = DocumentHighlighter::new(
            self.engine.clone(),
            Arc::clone(&self.analyzers),
            fields,
            tasks,
            HighlightRenderer::from_config(&self.config),
        );
        Ok(match &self.metrics {
            Some(metrics) => highlighter.with_metrics(metrics.clone()),
            None => highlighter,
        })
    }

    /// Highlight a batch of documents
    ///
    /// Every document gets an entry, empty when nothing was highlighted.
    pub fn highlight<D: StoredDocument>(
        &self,
        docs: &[D],
        primary: &Query,
        request: &HighlightRequest,
    ) -> Result<HighlightResponse> {
        let prepared = self.prepare(request, primary);
        let highlighter = self.document_highlighter(request, prepared.tasks)?;

        let highlighting = docs
            .iter()
            .map(|doc| DocumentHighlights {
                id: doc.id().to_string(),
                fields: highlighter.highlight_doc(doc).into_iter().collect(),
            })
            .collect();

        Ok(HighlightResponse {
            highlighting,
            rejected: prepared.rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::models::Document;
    use crate::schema::{FieldMapping, IndexMapping, Schema};

    fn highlighter() -> SpanHighlighter {
        let schema = Schema::new(
            IndexMapping::new().field("title", FieldMapping::text_with_analyzer("english")),
            TokenizerConfig::standard(),
        );
        SpanHighlighter::new(HighlightConfig::default().with_tags("[", "]"), Arc::new(schema))
    }

    fn banana() -> Document {
        Document::new("1").with_field("text", "what is my banana doing over there?")
    }

    #[test]
    fn test_primary_query_is_the_default_task() {
        let h = highlighter();
        let primary = h.parse_query("banana").unwrap();
        let prepared = h.prepare(&h.request(), &primary);

        assert_eq!(prepared.tasks.len(), 1);
        assert_eq!(prepared.tasks[0].priority(), 0);
        assert_eq!(prepared.tasks[0].pre_tag(), "[");
        assert!(prepared.rejected.is_empty());
    }

    #[test]
    fn test_auxiliary_queries_replace_primary() {
        let h = highlighter();
        let primary = h.parse_query("banana").unwrap();
        let request = h
            .request()
            .with_query(HighlightQuery::new("over"))
            .with_query(HighlightQuery::new("there").with_tags("<b>", "</b>"));
        let prepared = h.prepare(&request, &primary);

        let priorities: Vec<i32> = prepared.tasks.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, vec![0, 1]);
        assert_eq!(prepared.tasks[0].post_tag(), "]");
        assert_eq!(prepared.tasks[1].post_tag(), "</b>");
    }

    #[test]
    fn test_custom_pre_tag_keeps_request_post_tag() {
        let h = highlighter();
        let request = h.request().with_query(HighlightQuery {
            query: "banana".into(),
            pre_tag: Some("<x>".into()),
            post_tag: None,
        });
        let prepared = h.prepare(&request, &Query::MatchAll);
        assert_eq!(prepared.tasks[0].pre_tag(), "<x>");
        assert_eq!(prepared.tasks[0].post_tag(), "]");
    }

    #[test]
    fn test_rejected_queries_do_not_stop_others() {
        let h = highlighter();
        let request = h
            .request()
            .with_query(HighlightQuery::new("title:\"dogs in the garden\""))
            .with_query(HighlightQuery::new("\"unterminated"))
            .with_query(HighlightQuery::new("banana"));
        let prepared = h.prepare(&request, &Query::MatchAll);

        assert_eq!(prepared.tasks.len(), 1);
        assert_eq!(prepared.tasks[0].priority(), 2);
        let rejected: Vec<usize> = prepared.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![0, 1]);
        assert!(prepared.rejected[0].error.contains("'dog' at position 0"));
    }

    #[test]
    fn test_all_auxiliary_queries_rejected_leaves_no_tasks() {
        let h = highlighter();
        let primary = h.parse_query("banana").unwrap();
        let request = h.request().with_query(HighlightQuery::new("\"unterminated"));
        let prepared = h.prepare(&request, &primary);

        assert!(prepared.tasks.is_empty());
        assert_eq!(prepared.rejected.len(), 1);

        let response = h.highlight(&[banana()], &primary, &request).unwrap();
        assert!(response.get("1").unwrap().is_empty());
    }

    #[test]
    fn test_query_limit() {
        let h = SpanHighlighter::new(
            HighlightConfig {
                max_highlight_queries: 2,
                ..HighlightConfig::default()
            },
            Arc::new(Schema::dynamic(TokenizerConfig::standard())),
        );
        let mut request = h.request();
        for q in ["a", "b", "c"] {
            request = request.with_query(HighlightQuery::new(q));
        }
        assert_eq!(h.prepare(&request, &Query::MatchAll).tasks.len(), 2);
    }

    #[test]
    fn test_highlight_every_document_gets_an_entry() {
        let h = highlighter();
        let primary = h.parse_query("+banana +over").unwrap();
        let docs = vec![banana(), Document::new("2").with_field("text", "nothing here")];
        let response = h
            .highlight(&docs, &primary, &h.request().with_field_list("text"))
            .unwrap();

        assert_eq!(response.highlighting.len(), 2);
        assert_eq!(
            response.get("1").unwrap()["text"],
            vec!["what is my [banana] doing [over] there?"]
        );
        assert!(response.get("2").unwrap().is_empty());
    }

    #[test]
    fn test_empty_field_list_uses_default_field() {
        let h = highlighter();
        let primary = h.parse_query("banana").unwrap();
        let doc = banana().with_field("other", "banana");
        let response = h.highlight(&[doc], &primary, &h.request()).unwrap();
        let fields = response.get("1").unwrap();
        assert!(fields.contains_key("text"));
        assert!(!fields.contains_key("other"));
    }

    #[test]
    fn test_response_serialization() {
        let response = HighlightResponse {
            highlighting: vec![DocumentHighlights {
                id: "1".into(),
                fields: BTreeMap::from([("text".to_string(), vec!["[a]".to_string()])]),
            }],
            rejected: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["highlighting"][0]["fields"]["text"][0], "[a]");
        assert!(json.get("rejected").is_none());
    }
}
