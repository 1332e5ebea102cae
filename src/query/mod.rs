//! Query trees and rewriting
//!
//! - [`Query`]: the input expression tree (terms, phrases, patterns, booleans)
//! - [`SpanQuery`]: span-capturing queries that know where they matched
//! - [`QueryRewriter`]: converts the former into the latter
//! - [`query_string`]: Lucene-style query string parsing

pub mod ast;
pub mod pattern;
pub mod query_string;
pub mod rewriter;
pub mod span;
pub mod types;

pub use ast::{BooleanClause, BooleanQuery, Occur, Query, Term};
pub use pattern::{TermMatcher, TermPattern};
pub use query_string::QueryStringParser;
pub use rewriter::QueryRewriter;
pub use span::{
    NoBulkScoringQuery, OffsetReportingQuery, RewrittenClause, RewrittenQuery, SpanNearBuilder,
    SpanQuery,
};
pub use types::{MatchOperator, MinimumShouldMatch, RangeBounds, RangeValue};
