use thiserror::Error;

/// Main error type for highlighting operations
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Unsupported query shape: {detail} (query: {query})")]
    UnsupportedQueryShape { query: String, detail: String },

    #[error("Query execution error: {0}")]
    QueryExecution(String),

    #[error("Query parse error: {0}")]
    QueryParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for highlighting operations
pub type Result<T> = std::result::Result<T, HighlightError>;

impl HighlightError {
    /// Create an unsupported-shape error for a query
    pub fn unsupported(query: impl std::fmt::Display, detail: impl Into<String>) -> Self {
        HighlightError::UnsupportedQueryShape {
            query: query.to_string(),
            detail: detail.into(),
        }
    }

    /// Check if this error only affects a single highlighting task
    ///
    /// Task-local errors drop that task's contribution; the remaining tasks
    /// and documents are still highlighted.
    pub fn is_task_local(&self) -> bool {
        matches!(
            self,
            HighlightError::UnsupportedQueryShape { .. }
                | HighlightError::QueryExecution(_)
                | HighlightError::QueryParseError(_)
        )
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            HighlightError::UnsupportedQueryShape { .. } => "unsupported_query_shape",
            HighlightError::QueryExecution(_) => "query_execution",
            HighlightError::QueryParseError(_) => "query_parse",
            HighlightError::InvalidRequest(_) => "invalid_request",
            HighlightError::Serialization(_) => "serialization",
            HighlightError::Io(_) => "io",
        }
    }
}
