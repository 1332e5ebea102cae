//! Span-capturing query trees
//!
//! Span queries match position ranges rather than whole documents, which is
//! what lets the highlighter recover the exact character span of every
//! matching occurrence. [`RewrittenQuery`] is the output of the rewriter:
//! span roots wrapped for offset reporting, recombined by the original
//! boolean and disjunction structure.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ast::{Occur, Query, Term};
use super::pattern::TermPattern;
use super::types::MinimumShouldMatch;
use crate::error::HighlightError;
use crate::Result;

/// Span query tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanQuery {
    /// Single term occurrence
    Term(Term),
    /// Any dictionary term matching a pattern
    MultiTerm { field: String, pattern: TermPattern },
    /// Union of the clauses' spans
    Or(Vec<SpanQuery>),
    /// Clauses near each other, within `slop` positions
    Near {
        field: String,
        clauses: Vec<SpanQuery>,
        slop: u32,
        in_order: bool,
    },
    /// A fixed-width hole; only meaningful as a clause of an ordered `Near`
    Gap(u32),
}

impl SpanQuery {
    /// Create a span term
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        SpanQuery::Term(Term::new(field, text))
    }

    /// Field the span query runs against; gaps and empty unions have none
    pub fn field(&self) -> Option<&str> {
        match self {
            SpanQuery::Term(term) => Some(&term.field),
            SpanQuery::MultiTerm { field, .. } | SpanQuery::Near { field, .. } => Some(field),
            SpanQuery::Or(clauses) => clauses.iter().find_map(|c| c.field()),
            SpanQuery::Gap(_) => None,
        }
    }
}

impl fmt::Display for SpanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanQuery::Term(term) => write!(f, "{}", term),
            SpanQuery::MultiTerm { field, pattern } => {
                write!(f, "SpanMultiTermQueryWrapper({}:{})", field, pattern)
            }
            SpanQuery::Or(clauses) => {
                let clauses: Vec<String> = clauses.iter().map(|c| c.to_string()).collect();
                write!(f, "spanOr([{}])", clauses.join(", "))
            }
            SpanQuery::Near {
                clauses,
                slop,
                in_order,
                ..
            } => {
                let clauses: Vec<String> = clauses.iter().map(|c| c.to_string()).collect();
                write!(f, "spanNear([{}], {}, {})", clauses.join(", "), slop, in_order)
            }
            SpanQuery::Gap(width) => write!(f, "SpanGap({})", width),
        }
    }
}

/// Builder for `SpanQuery::Near`
#[derive(Debug)]
pub struct SpanNearBuilder {
    field: String,
    in_order: bool,
    clauses: Vec<SpanQuery>,
    slop: u32,
}

impl SpanNearBuilder {
    /// Start an ordered near query
    pub fn ordered(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }

    /// Start an unordered near query
    pub fn unordered(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    fn new(field: impl Into<String>, in_order: bool) -> Self {
        Self {
            field: field.into(),
            in_order,
            clauses: Vec::new(),
            slop: 0,
        }
    }

    /// Add a clause, which must target the builder's field
    pub fn add_clause(mut self, clause: SpanQuery) -> Result<Self> {
        if let Some(field) = clause.field() {
            if field != self.field {
                return Err(HighlightError::unsupported(
                    &clause,
                    format!(
                        "clause field is '{}' not equal with field '{}'",
                        field, self.field
                    ),
                ));
            }
        }
        self.clauses.push(clause);
        Ok(self)
    }

    /// Add a gap of `width` positions
    pub fn add_gap(mut self, width: u32) -> Result<Self> {
        if !self.in_order {
            return Err(HighlightError::unsupported(
                SpanQuery::Gap(width),
                "gaps can only be added to ordered near queries",
            ));
        }
        self.clauses.push(SpanQuery::Gap(width));
        Ok(self)
    }

    pub fn slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn build(self) -> SpanQuery {
        SpanQuery::Near {
            field: self.field,
            clauses: self.clauses,
            slop: self.slop,
            in_order: self.in_order,
        }
    }
}

/// Span query whose execution must expose character offsets for every leaf
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffsetReportingQuery {
    query: SpanQuery,
}

impl OffsetReportingQuery {
    pub fn new(query: SpanQuery) -> Self {
        Self { query }
    }

    /// The wrapped span query
    pub fn query(&self) -> &SpanQuery {
        &self.query
    }

    pub fn field(&self) -> Option<&str> {
        self.query.field()
    }
}

impl fmt::Display for OffsetReportingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)
    }
}

/// A clause of a rewritten boolean query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewrittenClause {
    pub occur: Occur,
    pub query: RewrittenQuery,
}

/// Boolean query with bulk scoring disabled
///
/// Bulk scoring evaluates a whole document range at once and never exposes
/// per-clause scorers, so span iterators below it would be unreachable.
/// Executing through this wrapper keeps the clause tree visible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoBulkScoringQuery {
    pub clauses: Vec<RewrittenClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
}

impl NoBulkScoringQuery {
    /// Clauses with the given occurrence
    pub fn clauses_with(&self, occur: Occur) -> impl Iterator<Item = &RewrittenQuery> {
        self.clauses
            .iter()
            .filter(move |c| c.occur == occur)
            .map(|c| &c.query)
    }
}

/// Output of query rewriting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewrittenQuery {
    /// Span root, wrapped for offset reporting
    Span(OffsetReportingQuery),
    /// Disjunction-max over rewritten disjuncts
    DisjunctionMax {
        disjuncts: Vec<RewrittenQuery>,
        tie_breaker: f32,
    },
    /// Boolean recombination with bulk scoring disabled
    Boolean(NoBulkScoringQuery),
    /// A query the rewriter could not transform; it yields no offsets
    Unrewritten(Query),
}

impl RewrittenQuery {
    /// Wrap a span query for offset reporting
    pub fn span(query: SpanQuery) -> Self {
        RewrittenQuery::Span(OffsetReportingQuery::new(query))
    }
}

impl fmt::Display for RewrittenQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewrittenQuery::Span(span) => write!(f, "{}", span),
            RewrittenQuery::DisjunctionMax { disjuncts, .. } => {
                let parts: Vec<String> = disjuncts.iter().map(|d| d.to_string()).collect();
                write!(f, "({})", parts.join(" | "))
            }
            RewrittenQuery::Boolean(query) => {
                let parts: Vec<String> = query
                    .clauses
                    .iter()
                    .map(|c| match c.occur {
                        Occur::Must => format!("+{}", c.query),
                        Occur::Should => c.query.to_string(),
                        Occur::MustNot => format!("-{}", c.query),
                    })
                    .collect();
                write!(f, "NoBulkScoring({})", parts.join(" "))
            }
            RewrittenQuery::Unrewritten(query) => write!(f, "{}", query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_builder() {
        let near = SpanNearBuilder::ordered("text")
            .add_clause(SpanQuery::term("text", "my"))
            .unwrap()
            .add_gap(1)
            .unwrap()
            .add_clause(SpanQuery::term("text", "doing"))
            .unwrap()
            .slop(2)
            .build();

        match &near {
            SpanQuery::Near {
                clauses,
                slop,
                in_order,
                ..
            } => {
                assert_eq!(clauses.len(), 3);
                assert_eq!(clauses[1], SpanQuery::Gap(1));
                assert_eq!(*slop, 2);
                assert!(in_order);
            }
            other => panic!("expected near, got {:?}", other),
        }
        assert_eq!(
            near.to_string(),
            "spanNear([text:my, SpanGap(1), text:doing], 2, true)"
        );
    }

    #[test]
    fn test_near_builder_rejects_other_field() {
        let err = SpanNearBuilder::ordered("text")
            .add_clause(SpanQuery::term("title", "my"))
            .unwrap_err();
        assert!(matches!(err, HighlightError::UnsupportedQueryShape { .. }));
    }

    #[test]
    fn test_gap_requires_ordered_near() {
        assert!(SpanNearBuilder::unordered("text").add_gap(1).is_err());
    }

    #[test]
    fn test_span_field() {
        let or = SpanQuery::Or(vec![
            SpanQuery::term("text", "a"),
            SpanQuery::term("text", "b"),
        ]);
        assert_eq!(or.field(), Some("text"));
        assert_eq!(SpanQuery::Gap(2).field(), None);
        assert_eq!(SpanQuery::Or(Vec::new()).field(), None);
    }
}
