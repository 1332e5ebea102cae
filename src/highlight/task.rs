use crate::query::RewrittenQuery;

/// One highlighting pass over a document
///
/// Tasks are built once per request and shared read-only across documents.
/// When offsets of several tasks overlap, the task with the lower priority
/// number keeps its tags.
#[derive(Debug)]
pub struct HighlightingTask {
    priority: i32,
    query: RewrittenQuery,
    pre_tag: String,
    post_tag: String,
}

impl HighlightingTask {
    pub fn new(
        priority: i32,
        query: RewrittenQuery,
        pre_tag: impl Into<String>,
        post_tag: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            query,
            pre_tag: pre_tag.into(),
            post_tag: post_tag.into(),
        }
    }

    /// Lower numbers win overlap conflicts
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn query(&self) -> &RewrittenQuery {
        &self.query
    }

    pub fn pre_tag(&self) -> &str {
        &self.pre_tag
    }

    pub fn post_tag(&self) -> &str {
        &self.post_tag
    }
}
