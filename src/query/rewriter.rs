//! Query rewriting into span-capturing form
//!
//! Every query shape that can report where it matched is converted into span
//! queries wrapped for offset reporting. Boolean and disjunction-max structure
//! is kept so the rewritten query matches the same documents as the input.

use tracing::{debug, warn};

use super::ast::{BooleanQuery, Query};
use super::span::{NoBulkScoringQuery, RewrittenClause, RewrittenQuery, SpanNearBuilder, SpanQuery};
use crate::error::HighlightError;
use crate::Result;

/// Converts query trees into their span-capturing equivalents
///
/// Rewriting is pure and deterministic; the same input always produces the
/// same output or the same error.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryRewriter;

impl QueryRewriter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite a query
    ///
    /// Fails with `UnsupportedQueryShape` when a phrase cannot be expressed
    /// as a span query; a failure anywhere fails the whole rewrite.
    pub fn rewrite(&self, query: &Query) -> Result<RewrittenQuery> {
        let rewritten = self.rewrite_query(query)?;
        debug!(query = %query, rewritten = %rewritten, "rewrote query");
        Ok(rewritten)
    }

    fn rewrite_query(&self, query: &Query) -> Result<RewrittenQuery> {
        match query {
            Query::Term(term) => Ok(RewrittenQuery::span(SpanQuery::Term(term.clone()))),
            Query::MultiTerm { field, pattern } => Ok(RewrittenQuery::span(SpanQuery::MultiTerm {
                field: field.clone(),
                pattern: pattern.clone(),
            })),
            Query::Phrase {
                field,
                terms,
                positions,
                slop,
            } => self
                .rewrite_phrase(query, field, terms, positions, *slop)
                .map(RewrittenQuery::span),
            Query::MultiPhrase {
                field,
                terms,
                positions,
                slop,
            } => self
                .rewrite_multi_phrase(query, field, terms, positions, *slop)
                .map(RewrittenQuery::span),
            Query::Disjunction { terms } => Ok(RewrittenQuery::span(SpanQuery::Or(
                terms.iter().cloned().map(SpanQuery::Term).collect(),
            ))),
            Query::DisjunctionMax {
                disjuncts,
                tie_breaker,
            } => Ok(RewrittenQuery::DisjunctionMax {
                disjuncts: disjuncts
                    .iter()
                    .map(|d| self.rewrite_query(d))
                    .collect::<Result<_>>()?,
                tie_breaker: *tie_breaker,
            }),
            Query::Boolean(bool_query) => self.rewrite_boolean(bool_query),
            // Boosts only affect scoring
            Query::Boost { query, .. } => self.rewrite_query(query),
            Query::Span(span) => Ok(RewrittenQuery::span(span.clone())),
            Query::MatchAll | Query::Range { .. } => {
                warn!(query = %query, kind = query.kind(), "don't know how to rewrite query, no offsets will be collected for it");
                Ok(RewrittenQuery::Unrewritten(query.clone()))
            }
        }
    }

    fn rewrite_boolean(&self, bool_query: &BooleanQuery) -> Result<RewrittenQuery> {
        let clauses = bool_query
            .clauses
            .iter()
            .map(|clause| {
                Ok(RewrittenClause {
                    occur: clause.occur,
                    query: self.rewrite_query(&clause.query)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RewrittenQuery::Boolean(NoBulkScoringQuery {
            clauses,
            minimum_should_match: bool_query.minimum_should_match.clone(),
        }))
    }

    /// Only phrases whose terms sit at strictly consecutive positions can be
    /// rewritten; holes and overlaps are rejected.
    fn rewrite_phrase(
        &self,
        query: &Query,
        field: &str,
        terms: &[String],
        positions: &[u32],
        slop: u32,
    ) -> Result<SpanQuery> {
        if terms.is_empty() {
            return Err(HighlightError::unsupported(query, "phrase has no terms"));
        }
        if terms.len() != positions.len() {
            return Err(HighlightError::unsupported(
                query,
                format!(
                    "phrase has {} terms but {} positions",
                    terms.len(),
                    positions.len()
                ),
            ));
        }

        let mut near = SpanNearBuilder::ordered(field).slop(slop);
        for (i, term) in terms.iter().enumerate() {
            if i > 0 && positions[i] as i64 - positions[0] as i64 != i as i64 {
                return Err(HighlightError::unsupported(
                    query,
                    format!(
                        "don't know how to rewrite a phrase with holes or overlaps: \
                         position must increase by 1 each time but found term '{}' at position {} \
                         followed by term '{}' at position {} \
                         (this could be caused, for example, by a stopwords filter in the query analyzer)",
                        terms[i - 1],
                        positions[i - 1],
                        term,
                        positions[i]
                    ),
                ));
            }
            near = near.add_clause(SpanQuery::term(field, term.clone()))?;
        }

        Ok(near.build())
    }

    fn rewrite_multi_phrase(
        &self,
        query: &Query,
        field: &str,
        terms: &[Vec<String>],
        positions: &[u32],
        slop: u32,
    ) -> Result<SpanQuery> {
        if terms.is_empty() {
            return Err(HighlightError::unsupported(query, "multi-phrase has no terms"));
        }
        if terms.len() != positions.len() {
            return Err(HighlightError::unsupported(
                query,
                format!(
                    "multi-phrase has {} term groups but {} positions",
                    terms.len(),
                    positions.len()
                ),
            ));
        }

        let mut near = SpanNearBuilder::ordered(field).slop(slop);
        for (i, alternatives) in terms.iter().enumerate() {
            if i > 0 {
                if positions[i] <= positions[i - 1] {
                    return Err(HighlightError::unsupported(
                        query,
                        format!(
                            "multi-phrase positions must increase but found {} followed by {}",
                            positions[i - 1],
                            positions[i]
                        ),
                    ));
                }
                let diff = positions[i] - positions[i - 1];
                if diff > 1 {
                    near = near.add_gap(diff - 1)?;
                }
            }

            let clause = match alternatives.as_slice() {
                [] => {
                    return Err(HighlightError::unsupported(
                        query,
                        format!("multi-phrase position {} has no terms", positions[i]),
                    ))
                }
                [single] => SpanQuery::term(field, single.clone()),
                many => SpanQuery::Or(
                    many.iter()
                        .map(|text| SpanQuery::term(field, text.clone()))
                        .collect(),
                ),
            };
            near = near.add_clause(clause)?;
        }

        Ok(near.build())
    }
}
