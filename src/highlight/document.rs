use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, trace};

use super::extractor::collect_spans;
use super::fields::FieldPattern;
use super::offsets::{merge_offsets, OffsetCollector};
use super::renderer::HighlightRenderer;
use super::task::HighlightingTask;
use crate::index::{AnalysisEngine, DocumentIndex, FieldText, StoredDocument};
use crate::metrics::{HighlightMetrics, OUTCOME_FAILED, OUTCOME_MATCHED, OUTCOME_NO_MATCH};
use crate::schema::AnalyzerLookup;
use crate::Result;

/// Highlights single documents against a fixed set of tasks
///
/// Holds no per-document state, so one instance can be shared by every
/// thread highlighting documents of the same request.
pub struct DocumentHighlighter<E: AnalysisEngine> {
    engine: E,
    analyzers: Arc<dyn AnalyzerLookup>,
    fields: Vec<FieldPattern>,
    tasks: Vec<Arc<HighlightingTask>>,
    renderer: HighlightRenderer,
    metrics: Option<HighlightMetrics>,
}

impl<E: AnalysisEngine> DocumentHighlighter<E> {
    pub fn new(
        engine: E,
        analyzers: Arc<dyn AnalyzerLookup>,
        fields: Vec<FieldPattern>,
        tasks: Vec<Arc<HighlightingTask>>,
        renderer: HighlightRenderer,
    ) -> Self {
        Self {
            engine,
            analyzers,
            fields,
            tasks,
            renderer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: HighlightMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn tasks(&self) -> &[Arc<HighlightingTask>] {
        &self.tasks
    }

    /// Tagged values per field
    ///
    /// Fields without a single tagged value are left out, so a document
    /// that matches nothing yields an empty map. Failing tasks are logged
    /// and skipped.
    pub fn highlight_doc(&self, doc: &dyn StoredDocument) -> HashMap<String, Vec<String>> {
        let started = Instant::now();
        let mut result = HashMap::new();

        let mut values = Vec::new();
        let mut fields: Vec<&str> = Vec::new();
        for (field, value) in doc.fields() {
            if !self.fields.iter().any(|pattern| pattern.matches(field)) {
                continue;
            }
            let Some(analyzer) = self.analyzers.index_analyzer(field) else {
                trace!(doc = doc.id(), field, "field is not analyzed, skipped");
                continue;
            };
            values.push(FieldText::new(field, value, analyzer));
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        if values.is_empty() || self.tasks.is_empty() {
            self.record_document(started, 0);
            return result;
        }

        let index = match self.engine.build_index(&values) {
            Ok(index) => index,
            Err(err) => {
                error!(doc = doc.id(), error = %err, "failed to index document for highlighting");
                self.record_document(started, 0);
                return result;
            }
        };

        let mut collector = OffsetCollector::new();
        for task in &self.tasks {
            match run_task(&index, task) {
                Ok(Some(offsets)) => {
                    let collected = offsets.len();
                    debug!(doc = doc.id(), priority = task.priority(), collected, "task matched");
                    collector.absorb(offsets);
                    self.record_task(OUTCOME_MATCHED, collected);
                }
                Ok(None) => self.record_task(OUTCOME_NO_MATCH, 0),
                Err(err) => {
                    error!(
                        doc = doc.id(),
                        priority = task.priority(),
                        query = %task.query(),
                        error = %err,
                        "highlighting task failed"
                    );
                    self.record_task(OUTCOME_FAILED, 0);
                }
            }
        }

        for field in fields {
            let offsets = collector.offsets(field);
            if offsets.is_empty() {
                continue;
            }
            let merged = merge_offsets(offsets);
            let rendered = self.renderer.render(&doc.values(field), &merged);
            if !rendered.is_empty() {
                result.insert(field.to_string(), rendered);
            }
        }

        self.record_document(started, result.len());
        result
    }

    fn record_task(&self, outcome: &str, offsets: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_task(outcome, offsets);
        }
    }

    fn record_document(&self, started: Instant, fields: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_document(started.elapsed().as_secs_f64(), fields);
        }
    }
}

/// Run one task; its offsets are kept apart until it has fully succeeded
fn run_task<I: DocumentIndex>(
    index: &I,
    task: &Arc<HighlightingTask>,
) -> Result<Option<OffsetCollector>> {
    let Some(mut tree) = index.search(task.query())? else {
        return Ok(None);
    };
    trace!(priority = task.priority(), tree = ?tree, "collecting spans");

    let mut offsets = OffsetCollector::new();
    collect_spans(&mut tree, &mut offsets.for_task(task))?;
    Ok(Some(offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::index::{MatchTree, MemoryEngine};
    use crate::models::Document;
    use crate::query::{Query, QueryRewriter, RewrittenQuery, SpanQuery};
    use crate::schema::Schema;

    fn task(priority: i32, query: &Query, pre: &str, post: &str) -> Arc<HighlightingTask> {
        let rewritten = QueryRewriter::new().rewrite(query).unwrap();
        Arc::new(HighlightingTask::new(priority, rewritten, pre, post))
    }

    fn highlighter(fields: &[&str], tasks: Vec<Arc<HighlightingTask>>) -> DocumentHighlighter<MemoryEngine> {
        DocumentHighlighter::new(
            MemoryEngine::default(),
            Arc::new(Schema::dynamic(TokenizerConfig::standard())),
            fields.iter().map(|f| FieldPattern::parse(f).unwrap()).collect(),
            tasks,
            HighlightRenderer::default(),
        )
    }

    fn banana_doc() -> Document {
        Document::new("1").with_field("text", "what is my banana doing over there?")
    }

    #[test]
    fn test_single_term() {
        let h = highlighter(&["text"], vec![task(0, &Query::term("text", "banana"), "[", "]")]);
        let result = h.highlight_doc(&banana_doc());
        assert_eq!(result["text"], vec!["what is my [banana] doing over there?"]);
    }

    #[test]
    fn test_unselected_fields_are_skipped() {
        let h = highlighter(&["title"], vec![task(0, &Query::term("text", "banana"), "[", "]")]);
        assert!(h.highlight_doc(&banana_doc()).is_empty());
    }

    #[test]
    fn test_priority_conflict_between_tasks() {
        let h = highlighter(
            &["*"],
            vec![
                task(0, &Query::phrase("text", &["my", "banana"]), "<a>", "</a>"),
                task(1, &Query::term("text", "banana"), "<b>", "</b>"),
                task(2, &Query::term("text", "over"), "<c>", "</c>"),
            ],
        );
        let result = h.highlight_doc(&banana_doc());
        assert_eq!(
            result["text"],
            vec!["what is <a>my</a> <a>banana</a> doing <c>over</c> there?"]
        );
    }

    /// Memory engine whose index fails on the term "banana"
    struct FailingSpans;

    impl AnalysisEngine for FailingSpans {
        type Index = FailingIndex;

        fn build_index(&self, values: &[FieldText]) -> Result<FailingIndex> {
            Ok(FailingIndex(MemoryEngine::default().build_index(values)?))
        }
    }

    struct FailingIndex(crate::index::MemoryIndex);

    impl DocumentIndex for FailingIndex {
        fn search(&self, query: &RewrittenQuery) -> Result<Option<MatchTree>> {
            let banana = matches!(
                query,
                RewrittenQuery::Span(span)
                    if matches!(span.query(), SpanQuery::Term(t) if t.text == "banana")
            );
            if banana {
                return Err(crate::HighlightError::QueryExecution("boom".into()));
            }
            self.0.search(query)
        }
    }

    #[test]
    fn test_failing_task_is_isolated() {
        let h = DocumentHighlighter::new(
            FailingSpans,
            Arc::new(Schema::dynamic(TokenizerConfig::standard())),
            vec![FieldPattern::All],
            vec![
                task(0, &Query::term("text", "banana"), "[", "]"),
                task(1, &Query::term("text", "over"), "[", "]"),
            ],
            HighlightRenderer::default(),
        );
        let result = h.highlight_doc(&banana_doc());
        assert_eq!(result["text"], vec!["what is my banana doing [over] there?"]);
    }

    #[test]
    fn test_metrics_record_outcomes() {
        let metrics = HighlightMetrics::new().unwrap();
        let h = highlighter(
            &["text"],
            vec![
                task(0, &Query::term("text", "banana"), "[", "]"),
                task(1, &Query::term("text", "apple"), "[", "]"),
            ],
        )
        .with_metrics(metrics.clone());

        h.highlight_doc(&banana_doc());
        assert_eq!(metrics.documents_highlighted.get(), 1.0);
        assert_eq!(metrics.offsets_collected.get(), 1.0);
        assert_eq!(
            metrics.tasks_total.with_label_values(&[OUTCOME_NO_MATCH]).get(),
            1.0
        );
    }
}
