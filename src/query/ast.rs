//! Query expression tree
//!
//! This is the input side of highlighting: the query a host hands over for a
//! document, before it is rewritten into a span-capturing form. Every leaf is
//! scoped to a single field.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::pattern::TermPattern;
use super::span::SpanQuery;
use super::types::{MinimumShouldMatch, RangeBounds};

/// A term in a field
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub text: String,
}

impl Term {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// How a boolean clause participates in matching
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match
    Must,
    /// The clause may match
    Should,
    /// The clause must not match
    MustNot,
}

impl Occur {
    fn prefix(&self) -> &'static str {
        match self {
            Occur::Must => "+",
            Occur::Should => "",
            Occur::MustNot => "-",
        }
    }
}

/// A clause of a boolean query
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BooleanClause {
    pub occur: Occur,
    pub query: Query,
}

/// Boolean combination of sub-queries
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanQuery {
    #[serde(default)]
    pub clauses: Vec<BooleanClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause with an explicit occurrence
    pub fn add(mut self, occur: Occur, query: Query) -> Self {
        self.clauses.push(BooleanClause { occur, query });
        self
    }

    /// Add a required clause
    pub fn must(self, query: Query) -> Self {
        self.add(Occur::Must, query)
    }

    /// Add an optional clause
    pub fn should(self, query: Query) -> Self {
        self.add(Occur::Should, query)
    }

    /// Add a prohibited clause
    pub fn must_not(self, query: Query) -> Self {
        self.add(Occur::MustNot, query)
    }

    /// Set the minimum number of optional clauses that must match
    pub fn with_minimum_should_match(mut self, msm: MinimumShouldMatch) -> Self {
        self.minimum_should_match = Some(msm);
        self
    }
}

/// Query expression tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Exact term
    Term(Term),

    /// Terms at the given positions, in order
    Phrase {
        field: String,
        terms: Vec<String>,
        positions: Vec<u32>,
        #[serde(default)]
        slop: u32,
    },

    /// Like a phrase, but each position offers alternative terms
    MultiPhrase {
        field: String,
        terms: Vec<Vec<String>>,
        positions: Vec<u32>,
        #[serde(default)]
        slop: u32,
    },

    /// Every dictionary term matching a pattern
    MultiTerm { field: String, pattern: TermPattern },

    /// Any of a set of terms (synonyms, term-in-set)
    Disjunction { terms: Vec<Term> },

    /// Best-matching of several disjuncts
    DisjunctionMax {
        disjuncts: Vec<Query>,
        #[serde(default)]
        tie_breaker: f32,
    },

    /// Boolean combination
    Boolean(BooleanQuery),

    /// Boosted query; the boost has no effect on highlighting
    Boost { query: Box<Query>, boost: f32 },

    /// A query that is already span-shaped
    Span(SpanQuery),

    /// Matches every document
    MatchAll,

    /// Term range over a field
    Range { field: String, bounds: RangeBounds },
}

impl Query {
    /// Create a term query
    pub fn term(field: impl Into<String>, text: impl Into<String>) -> Self {
        Query::Term(Term::new(field, text))
    }

    /// Create an exact phrase with consecutive positions
    pub fn phrase<S: AsRef<str>>(field: impl Into<String>, terms: &[S]) -> Self {
        Query::Phrase {
            field: field.into(),
            terms: terms.iter().map(|t| t.as_ref().to_string()).collect(),
            positions: (0..terms.len() as u32).collect(),
            slop: 0,
        }
    }

    /// Create a phrase with explicit term positions
    pub fn phrase_with_positions(
        field: impl Into<String>,
        terms: Vec<String>,
        positions: Vec<u32>,
        slop: u32,
    ) -> Self {
        Query::Phrase {
            field: field.into(),
            terms,
            positions,
            slop,
        }
    }

    /// Create a wildcard query
    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Query::MultiTerm {
            field: field.into(),
            pattern: TermPattern::Wildcard(pattern.into()),
        }
    }

    /// Create a prefix query
    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Query::MultiTerm {
            field: field.into(),
            pattern: TermPattern::Prefix(prefix.into()),
        }
    }

    /// Create a fuzzy query
    pub fn fuzzy(field: impl Into<String>, term: impl Into<String>, max_edits: u32) -> Self {
        Query::MultiTerm {
            field: field.into(),
            pattern: TermPattern::Fuzzy {
                term: term.into(),
                max_edits,
                prefix_length: 0,
            },
        }
    }

    /// Wrap this query with a boost
    pub fn boosted(self, boost: f32) -> Self {
        Query::Boost {
            query: Box::new(self),
            boost,
        }
    }

    /// Get the query type name for debugging and logging
    pub fn kind(&self) -> &'static str {
        match self {
            Query::Term(_) => "term",
            Query::Phrase { .. } => "phrase",
            Query::MultiPhrase { .. } => "multi_phrase",
            Query::MultiTerm { .. } => "multi_term",
            Query::Disjunction { .. } => "disjunction",
            Query::DisjunctionMax { .. } => "disjunction_max",
            Query::Boolean(_) => "boolean",
            Query::Boost { .. } => "boost",
            Query::Span(_) => "span",
            Query::MatchAll => "match_all",
            Query::Range { .. } => "range",
        }
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

impl From<SpanQuery> for Query {
    fn from(query: SpanQuery) -> Self {
        Query::Span(query)
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(term) => write!(f, "{}", term),
            Query::Phrase {
                field, terms, slop, ..
            } => {
                write!(f, "{}:\"{}\"", field, terms.join(" "))?;
                if *slop > 0 {
                    write!(f, "~{}", slop)?;
                }
                Ok(())
            }
            Query::MultiPhrase {
                field, terms, slop, ..
            } => {
                let positions: Vec<String> = terms
                    .iter()
                    .map(|alternatives| match alternatives.as_slice() {
                        [single] => single.clone(),
                        many => format!("({})", many.join(" ")),
                    })
                    .collect();
                write!(f, "{}:\"{}\"", field, positions.join(" "))?;
                if *slop > 0 {
                    write!(f, "~{}", slop)?;
                }
                Ok(())
            }
            Query::MultiTerm { field, pattern } => write!(f, "{}:{}", field, pattern),
            Query::Disjunction { terms } => write!(f, "Synonym({})", join(terms, " ")),
            Query::DisjunctionMax {
                disjuncts,
                tie_breaker,
            } => {
                write!(f, "({})", join(disjuncts, " | "))?;
                if *tie_breaker != 0.0 {
                    write!(f, "~{}", tie_breaker)?;
                }
                Ok(())
            }
            Query::Boolean(bool_query) => {
                let clauses: Vec<String> = bool_query
                    .clauses
                    .iter()
                    .map(|c| format!("{}{}", c.occur.prefix(), c.query))
                    .collect();
                write!(f, "({})", clauses.join(" "))
            }
            Query::Boost { query, boost } => write!(f, "({})^{}", query, boost),
            Query::Span(span) => write!(f, "{}", span),
            Query::MatchAll => write!(f, "*:*"),
            Query::Range { field, bounds } => write!(f, "{}:{}", field, bounds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_positions() {
        let query = Query::phrase("text", &["my", "banana"]);
        match query {
            Query::Phrase {
                terms, positions, ..
            } => {
                assert_eq!(terms, vec!["my", "banana"]);
                assert_eq!(positions, vec![0, 1]);
            }
            other => panic!("expected phrase, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_builder() {
        let query = BooleanQuery::new()
            .must(Query::term("text", "banana"))
            .should(Query::term("text", "over"))
            .must_not(Query::term("text", "apple"));

        assert_eq!(query.clauses.len(), 3);
        assert_eq!(query.clauses[0].occur, Occur::Must);
        assert_eq!(query.clauses[2].occur, Occur::MustNot);
    }

    #[test]
    fn test_display() {
        let query: Query = BooleanQuery::new()
            .must(Query::term("text", "banana"))
            .must_not(Query::phrase("text", &["over", "there"]))
            .into();
        assert_eq!(query.to_string(), "(+text:banana -text:\"over there\")");

        assert_eq!(Query::prefix("title", "ban").to_string(), "title:ban*");
        assert_eq!(
            Query::term("text", "banana").boosted(2.0).to_string(),
            "(text:banana)^2"
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let query: Query = BooleanQuery::new()
            .must(Query::wildcard("text", "ban*"))
            .should(Query::Disjunction {
                terms: vec![Term::new("text", "fast"), Term::new("text", "quick")],
            })
            .into();

        let json = serde_json::to_string(&query).unwrap();
        let back: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(query, back);
    }

    #[test]
    fn test_kind() {
        assert_eq!(Query::MatchAll.kind(), "match_all");
        assert_eq!(Query::term("a", "b").boosted(1.5).kind(), "boost");
    }
}
