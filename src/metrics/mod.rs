use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Task outcome label: the task's query matched and offsets were collected
pub const OUTCOME_MATCHED: &str = "matched";
/// Task outcome label: the document did not match the task's query
pub const OUTCOME_NO_MATCH: &str = "no_match";
/// Task outcome label: the task failed and contributed nothing
pub const OUTCOME_FAILED: &str = "failed";

/// Prometheus metrics for the highlighter
#[derive(Clone)]
pub struct HighlightMetrics {
    // Counters
    pub documents_highlighted: Counter,
    pub tasks_total: CounterVec,
    pub rejected_queries: Counter,
    pub offsets_collected: Counter,
    pub fields_rendered: Counter,

    // Histograms
    pub highlight_latency: Histogram,

    // Registry
    registry: Arc<Registry>,
}

impl HighlightMetrics {
    /// Create a new HighlightMetrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let documents_highlighted = Counter::with_opts(Opts::new(
            "spanlight_documents_highlighted_total",
            "Total number of documents highlighted",
        ))?;
        registry.register(Box::new(documents_highlighted.clone()))?;

        let tasks_total = CounterVec::new(
            Opts::new(
                "spanlight_tasks_total",
                "Highlighting task executions by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(tasks_total.clone()))?;

        let rejected_queries = Counter::with_opts(Opts::new(
            "spanlight_rejected_queries_total",
            "Highlight queries that could not be parsed or rewritten",
        ))?;
        registry.register(Box::new(rejected_queries.clone()))?;

        let offsets_collected = Counter::with_opts(Opts::new(
            "spanlight_offsets_collected_total",
            "Total number of match offsets collected",
        ))?;
        registry.register(Box::new(offsets_collected.clone()))?;

        let fields_rendered = Counter::with_opts(Opts::new(
            "spanlight_fields_rendered_total",
            "Total number of fields with at least one highlighted value",
        ))?;
        registry.register(Box::new(fields_rendered.clone()))?;

        let highlight_latency = Histogram::with_opts(
            HistogramOpts::new(
                "spanlight_highlight_latency_seconds",
                "Per-document highlighting latency",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(highlight_latency.clone()))?;

        Ok(Self {
            documents_highlighted,
            tasks_total,
            rejected_queries,
            offsets_collected,
            fields_rendered,
            highlight_latency,
            registry: Arc::new(registry),
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record one highlighted document
    pub fn record_document(&self, duration_secs: f64, fields: usize) {
        self.documents_highlighted.inc();
        self.fields_rendered.inc_by(fields as f64);
        self.highlight_latency.observe(duration_secs);
    }

    /// Record a task execution with one of the `OUTCOME_*` labels
    pub fn record_task(&self, outcome: &str, offsets: usize) {
        self.tasks_total.with_label_values(&[outcome]).inc();
        self.offsets_collected.inc_by(offsets as f64);
    }

    pub fn record_rejected_query(&self) {
        self.rejected_queries.inc();
    }

    /// Render every metric in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for HighlightMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_encode() {
        let metrics = HighlightMetrics::new().unwrap();
        metrics.record_task(OUTCOME_MATCHED, 3);
        metrics.record_task(OUTCOME_FAILED, 0);
        metrics.record_document(0.002, 1);
        metrics.record_rejected_query();

        assert_eq!(metrics.offsets_collected.get(), 3.0);
        assert_eq!(
            metrics
                .tasks_total
                .with_label_values(&[OUTCOME_MATCHED])
                .get(),
            1.0
        );

        let text = metrics.encode().unwrap();
        assert!(text.contains("spanlight_documents_highlighted_total 1"));
        assert!(text.contains("spanlight_rejected_queries_total 1"));
    }
}
