//! Recursive descent parser for query strings
//!
//! # Grammar
//!
//! ```text
//! query       := clause*
//! clause      := (AND | OR)? ('+' | '-' | NOT)? primary
//! primary     := field_query | grouped | phrase | term | '*' | '*:*'
//! field_query := TERM COLON (range | grouped | phrase | term | '*')
//! range       := ('[' | '{') value TO value (']' | '}')
//! phrase      := QUOTED (TILDE slop?)? (CARET boost?)?
//! term        := TERM (TILDE distance?)? (CARET boost?)?
//! grouped     := '(' query ')' (CARET boost?)?
//! ```
//!
//! Clauses of one level land in a single boolean query. `+` makes a clause
//! required, `-` and `NOT` prohibit it, `AND` makes both neighbours required
//! and unmarked clauses follow the default operator.

use super::lexer::{Lexer, Token};
use crate::error::HighlightError;
use crate::query::ast::{BooleanClause, BooleanQuery, Occur, Query, Term};
use crate::query::pattern::TermPattern;
use crate::query::types::{MatchOperator, RangeBounds, RangeValue};
use crate::schema::AnalyzerLookup;
use crate::Result;

/// Default field to search when no field is specified
pub const DEFAULT_FIELD: &str = "text";

/// Default fuzzy edit distance when `~` has no number
const DEFAULT_FUZZINESS: u32 = 2;

/// Largest edit distance a fuzzy term may request
const MAX_FUZZINESS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Conjunction {
    None,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

/// Parser for Lucene-style query strings
///
/// Free text is analyzed with each field's search analyzer, so the leaves
/// of the resulting query hold indexed terms.
pub struct QueryStringParser<'a> {
    lexer: Lexer,
    current_token: Token,
    analyzers: &'a dyn AnalyzerLookup,
    /// Default field for unqualified terms
    default_field: String,
    /// Default operator between unmarked clauses
    default_operator: MatchOperator,
}

impl<'a> QueryStringParser<'a> {
    /// Create a new parser for the given query string
    pub fn new(input: &str, analyzers: &'a dyn AnalyzerLookup) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current_token,
            analyzers,
            default_field: DEFAULT_FIELD.to_string(),
            default_operator: MatchOperator::Or,
        })
    }

    /// Set the default field for unqualified terms
    pub fn with_default_field(mut self, field: impl Into<String>) -> Self {
        self.default_field = field.into();
        self
    }

    /// Set the default operator between clauses
    pub fn with_default_operator(mut self, operator: MatchOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Parse the query string into a query tree
    ///
    /// A query whose every clause analyzes away (all stopwords, say) parses
    /// to an empty boolean query, which matches nothing.
    pub fn parse(mut self) -> Result<Query> {
        if self.current_token == Token::Eof {
            return Err(HighlightError::QueryParseError("Empty query".to_string()));
        }

        let field = self.default_field.clone();
        let query = self.parse_query(&field)?;

        // Ensure we've consumed all input
        if self.current_token != Token::Eof {
            return Err(HighlightError::QueryParseError(format!(
                "Unexpected token after query: {:?}",
                self.current_token
            )));
        }

        Ok(query.unwrap_or_else(|| Query::Boolean(BooleanQuery::new())))
    }

    /// Parse clauses until the end of input or a closing parenthesis
    fn parse_query(&mut self, field: &str) -> Result<Option<Query>> {
        let mut clauses: Vec<BooleanClause> = Vec::new();
        let mut single_plain = false;

        while !matches!(self.current_token, Token::Eof | Token::RightParen) {
            let conjunction = match self.current_token {
                Token::And => {
                    self.advance()?;
                    Conjunction::And
                }
                Token::Or => {
                    self.advance()?;
                    Conjunction::Or
                }
                _ => Conjunction::None,
            };

            let modifier = match self.current_token {
                Token::Plus => {
                    self.advance()?;
                    Modifier::Required
                }
                Token::Minus | Token::Not => {
                    self.advance()?;
                    Modifier::Prohibited
                }
                _ => Modifier::None,
            };

            let query = self.parse_primary(field)?;
            single_plain = clauses.is_empty()
                && conjunction == Conjunction::None
                && modifier == Modifier::None;
            self.add_clause(&mut clauses, conjunction, modifier, query);
        }

        if clauses.is_empty() {
            return Ok(None);
        }
        if clauses.len() == 1 && single_plain && clauses[0].occur != Occur::MustNot {
            return Ok(clauses.pop().map(|c| c.query));
        }
        Ok(Some(Query::Boolean(BooleanQuery {
            clauses,
            minimum_should_match: None,
        })))
    }

    /// Decide a clause's occurrence from its conjunction and modifier
    ///
    /// An explicit conjunction can also change the previous clause: `AND`
    /// makes it required, `OR` under a default `AND` makes it optional.
    fn add_clause(
        &self,
        clauses: &mut Vec<BooleanClause>,
        conjunction: Conjunction,
        modifier: Modifier,
        query: Option<Query>,
    ) {
        if let Some(last) = clauses.last_mut() {
            if last.occur != Occur::MustNot {
                match (conjunction, self.default_operator) {
                    (Conjunction::And, _) => last.occur = Occur::Must,
                    (Conjunction::Or, MatchOperator::And) => last.occur = Occur::Should,
                    _ => {}
                }
            }
        }

        // Clauses that analyzed to nothing are dropped
        let Some(query) = query else {
            return;
        };

        let prohibited = modifier == Modifier::Prohibited;
        let required = match self.default_operator {
            MatchOperator::Or => {
                modifier == Modifier::Required || (conjunction == Conjunction::And && !prohibited)
            }
            MatchOperator::And => !prohibited && conjunction != Conjunction::Or,
        };

        let occur = if required {
            Occur::Must
        } else if prohibited {
            Occur::MustNot
        } else {
            Occur::Should
        };
        clauses.push(BooleanClause { occur, query });
    }

    fn parse_primary(&mut self, field: &str) -> Result<Option<Query>> {
        match &self.current_token {
            Token::LeftParen => self.parse_group(field),
            Token::Asterisk => {
                self.advance()?;
                if self.current_token == Token::Colon {
                    self.advance()?;
                    self.expect(Token::Asterisk)?;
                }
                Ok(Some(Query::MatchAll))
            }
            Token::Term(term) => {
                let term = term.clone();
                self.advance()?;

                // A term followed by a colon names a field
                if self.current_token == Token::Colon {
                    self.advance()?;
                    self.parse_field_value(&term)
                } else {
                    self.parse_term(field, &term)
                }
            }
            Token::QuotedString(text) => {
                let text = text.clone();
                self.advance()?;
                self.parse_phrase(field, &text)
            }
            _ => Err(HighlightError::QueryParseError(format!(
                "Unexpected token: {:?}",
                self.current_token
            ))),
        }
    }

    /// Parse field value after `field:`
    fn parse_field_value(&mut self, field: &str) -> Result<Option<Query>> {
        match &self.current_token {
            Token::LeftBracket | Token::LeftBrace => self.parse_range(field).map(Some),
            Token::LeftParen => self.parse_group(field),
            Token::QuotedString(text) => {
                let text = text.clone();
                self.advance()?;
                self.parse_phrase(field, &text)
            }
            Token::Term(term) => {
                let term = term.clone();
                self.advance()?;
                self.parse_term(field, &term)
            }
            Token::Asterisk => {
                // field:* matches every term of the field
                self.advance()?;
                let boost = self.parse_boost()?;
                Ok(Some(with_boost(
                    Query::wildcard(field, "*"),
                    boost,
                )))
            }
            _ => Err(HighlightError::QueryParseError(format!(
                "Expected value after field '{}:', got {:?}",
                field, self.current_token
            ))),
        }
    }

    /// Parse `( query )`; a field prefix applies to every unqualified clause inside
    fn parse_group(&mut self, field: &str) -> Result<Option<Query>> {
        self.expect(Token::LeftParen)?;
        let inner = self.parse_query(field)?;
        self.expect(Token::RightParen)?;
        let boost = self.parse_boost()?;
        Ok(inner.map(|q| with_boost(q, boost)))
    }

    /// Parse a term with optional fuzzy and boost modifiers
    fn parse_term(&mut self, field: &str, text: &str) -> Result<Option<Query>> {
        let fuzziness = match self.current_token {
            Token::Tilde(distance) => {
                self.advance()?;
                Some(distance.unwrap_or(DEFAULT_FUZZINESS).min(MAX_FUZZINESS))
            }
            _ => None,
        };
        let boost = self.parse_boost()?;

        let query = if let Some(max_edits) = fuzziness {
            Some(Query::MultiTerm {
                field: field.to_string(),
                pattern: TermPattern::Fuzzy {
                    term: self.normalize_pattern(field, text),
                    max_edits,
                    prefix_length: 0,
                },
            })
        } else if let Some(pattern) = self.wildcard_pattern(field, text) {
            Some(Query::MultiTerm {
                field: field.to_string(),
                pattern,
            })
        } else {
            self.analyze_text(field, text, 0)
        };

        Ok(query.map(|q| with_boost(q, boost)))
    }

    /// Parse a quoted phrase with optional slop and boost
    fn parse_phrase(&mut self, field: &str, text: &str) -> Result<Option<Query>> {
        let slop = match self.current_token {
            Token::Tilde(slop) => {
                self.advance()?;
                slop.unwrap_or(0)
            }
            _ => 0,
        };
        let boost = self.parse_boost()?;
        Ok(self
            .analyze_text(field, text, slop)
            .map(|q| with_boost(q, boost)))
    }

    /// Parse range query: `[low TO high]` or `{low TO high}`
    fn parse_range(&mut self, field: &str) -> Result<Query> {
        let inclusive_lower = self.current_token == Token::LeftBracket;
        self.advance()?;

        let lower = self.parse_range_value()?;
        self.expect(Token::To)?;
        let upper = self.parse_range_value()?;

        let inclusive_upper = match self.current_token {
            Token::RightBracket => true,
            Token::RightBrace => false,
            _ => {
                return Err(HighlightError::QueryParseError(
                    "Expected ']' or '}' at end of range".to_string(),
                ))
            }
        };
        self.advance()?;
        let boost = self.parse_boost()?;

        let (gte, gt) = if inclusive_lower { (lower, None) } else { (None, lower) };
        let (lte, lt) = if inclusive_upper { (upper, None) } else { (None, upper) };
        let range = Query::Range {
            field: field.to_string(),
            bounds: RangeBounds { gte, gt, lte, lt },
        };
        Ok(with_boost(range, boost))
    }

    /// Parse a single range value; `*` is unbounded
    fn parse_range_value(&mut self) -> Result<Option<RangeValue>> {
        let value = match &self.current_token {
            Token::Asterisk => None,
            Token::Term(s) | Token::QuotedString(s) => Some(if let Ok(i) = s.parse::<i64>() {
                RangeValue::Long(i)
            } else if let Ok(f) = s.parse::<f64>() {
                RangeValue::Double(f)
            } else {
                RangeValue::String(s.clone())
            }),
            _ => {
                return Err(HighlightError::QueryParseError(format!(
                    "Expected range value, got: {:?}",
                    self.current_token
                )))
            }
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_boost(&mut self) -> Result<Option<f32>> {
        match self.current_token {
            Token::Caret(boost) => {
                self.advance()?;
                Ok(Some(boost.unwrap_or(1.0)))
            }
            _ => Ok(None),
        }
    }

    /// Classify a raw term as a prefix or wildcard pattern
    fn wildcard_pattern(&self, field: &str, text: &str) -> Option<TermPattern> {
        let wildcards = text.matches(['*', '?']).count();
        if wildcards == 0 {
            return None;
        }
        let normalized = self.normalize_pattern(field, text);
        match normalized.strip_suffix('*') {
            Some(prefix) if wildcards == 1 => Some(TermPattern::Prefix(prefix.to_string())),
            _ => Some(TermPattern::Wildcard(normalized)),
        }
    }

    fn normalize_pattern(&self, field: &str, text: &str) -> String {
        match self.analyzers.search_analyzer(field) {
            Some(analyzer) => analyzer.normalize_pattern(text),
            None => text.to_string(),
        }
    }

    /// Turn free text into term, synonym, phrase or multi-phrase leaves
    fn analyze_text(&self, field: &str, text: &str, slop: u32) -> Option<Query> {
        let Some(analyzer) = self.analyzers.search_analyzer(field) else {
            // Unanalyzed fields match the raw text
            return Some(Query::term(field, text));
        };

        let tokens = analyzer.analyze(text);
        let (first, rest) = tokens.split_first()?;
        if rest.is_empty() {
            return Some(Query::term(field, first.term.clone()));
        }

        // Group tokens stacked on the same position
        let mut positions: Vec<u32> = Vec::new();
        let mut stacked: Vec<Vec<String>> = Vec::new();
        for token in &tokens {
            match positions.last() {
                Some(&last) if last == token.position => {
                    if let Some(group) = stacked.last_mut() {
                        group.push(token.term.clone());
                    }
                }
                _ => {
                    positions.push(token.position);
                    stacked.push(vec![token.term.clone()]);
                }
            }
        }

        if positions.len() == 1 {
            return Some(Query::Disjunction {
                terms: tokens
                    .into_iter()
                    .map(|t| Term::new(field, t.term))
                    .collect(),
            });
        }

        if stacked.iter().all(|group| group.len() == 1) {
            return Some(Query::Phrase {
                field: field.to_string(),
                terms: stacked.into_iter().flatten().collect(),
                positions,
                slop,
            });
        }

        Some(Query::MultiPhrase {
            field: field.to_string(),
            terms: stacked,
            positions,
            slop,
        })
    }

    /// Advance to the next token
    fn advance(&mut self) -> Result<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    /// Expect a specific token and advance
    fn expect(&mut self, expected: Token) -> Result<()> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(HighlightError::QueryParseError(format!(
                "Expected {:?}, got {:?}",
                expected, self.current_token
            )))
        }
    }
}

fn with_boost(query: Query, boost: Option<f32>) -> Query {
    match boost {
        Some(boost) => query.boosted(boost),
        None => query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerConfig;
    use crate::schema::{FieldMapping, IndexMapping, Schema};

    fn schema() -> Schema {
        let mapping = IndexMapping::new()
            .field("title", FieldMapping::text_with_analyzer("english"))
            .field("year", FieldMapping::long());
        Schema::new(mapping, TokenizerConfig::standard())
    }

    fn parse(input: &str) -> Result<Query> {
        let schema = schema();
        QueryStringParser::new(input, &schema)?.parse()
    }

    fn parse_and(input: &str) -> Query {
        let schema = schema();
        QueryStringParser::new(input, &schema)
            .unwrap()
            .with_default_operator(MatchOperator::And)
            .parse()
            .unwrap()
    }

    fn occurs(query: &Query) -> Vec<Occur> {
        match query {
            Query::Boolean(b) => b.clauses.iter().map(|c| c.occur).collect(),
            other => panic!("expected boolean, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_term_is_analyzed() {
        assert_eq!(parse("Banana").unwrap(), Query::term("text", "banana"));
    }

    #[test]
    fn test_field_term() {
        assert_eq!(parse("title:Running").unwrap(), Query::term("title", "run"));
    }

    #[test]
    fn test_required_clauses() {
        let query = parse("+banana +over").unwrap();
        assert_eq!(occurs(&query), vec![Occur::Must, Occur::Must]);
        assert_eq!(query.to_string(), "(+text:banana +text:over)");
    }

    #[test]
    fn test_default_or() {
        let query = parse("banana over").unwrap();
        assert_eq!(occurs(&query), vec![Occur::Should, Occur::Should]);
    }

    #[test]
    fn test_default_and() {
        let query = parse_and("banana over");
        assert_eq!(occurs(&query), vec![Occur::Must, Occur::Must]);

        let query = parse_and("banana OR over");
        assert_eq!(occurs(&query), vec![Occur::Should, Occur::Should]);
    }

    #[test]
    fn test_explicit_and_marks_both_sides() {
        let query = parse("apple banana AND over").unwrap();
        assert_eq!(occurs(&query), vec![Occur::Should, Occur::Must, Occur::Must]);
    }

    #[test]
    fn test_prohibited_clauses() {
        let query = parse("banana -apple NOT cherry").unwrap();
        assert_eq!(
            occurs(&query),
            vec![Occur::Should, Occur::MustNot, Occur::MustNot]
        );

        // AND never turns a prohibited clause into a required one
        let query = parse("-apple AND banana").unwrap();
        assert_eq!(occurs(&query), vec![Occur::MustNot, Occur::Must]);
    }

    #[test]
    fn test_lone_negation_stays_boolean() {
        let query = parse("-apple").unwrap();
        assert_eq!(occurs(&query), vec![Occur::MustNot]);
    }

    #[test]
    fn test_quoted_phrase() {
        let query = parse("\"my Banana\"~2").unwrap();
        assert_eq!(
            query,
            Query::Phrase {
                field: "text".into(),
                terms: vec!["my".into(), "banana".into()],
                positions: vec![0, 1],
                slop: 2,
            }
        );
    }

    #[test]
    fn test_stopwords_leave_position_holes() {
        let query = parse("title:\"dogs in the garden\"").unwrap();
        assert_eq!(
            query,
            Query::Phrase {
                field: "title".into(),
                terms: vec!["dog".into(), "garden".into()],
                positions: vec![0, 3],
                slop: 0,
            }
        );
    }

    #[test]
    fn test_stopword_only_clause_is_dropped() {
        let query = parse("title:the title:banana").unwrap();
        assert_eq!(query, Query::term("title", "banana"));

        let empty = parse("title:the").unwrap();
        assert_eq!(empty, Query::Boolean(BooleanQuery::new()));
    }

    #[test]
    fn test_field_group_applies_field() {
        let query = parse("title:(Dogs Cats)").unwrap();
        match query {
            Query::Boolean(b) => {
                assert_eq!(b.clauses[0].query, Query::term("title", "dog"));
                assert_eq!(b.clauses[1].query, Query::term("title", "cat"));
            }
            other => panic!("expected boolean, got {:?}", other),
        }
    }

    #[test]
    fn test_patterns() {
        assert_eq!(parse("Prog*").unwrap(), Query::prefix("text", "prog"));
        assert_eq!(parse("p*ing").unwrap(), Query::wildcard("text", "p*ing"));
        assert_eq!(parse("te?t").unwrap(), Query::wildcard("text", "te?t"));
        assert_eq!(parse("rust~1").unwrap(), Query::fuzzy("text", "rust", 1));
        assert_eq!(parse("rust~").unwrap(), Query::fuzzy("text", "rust", 2));
        assert_eq!(parse("rust~9").unwrap(), Query::fuzzy("text", "rust", 2));
    }

    #[test]
    fn test_boost() {
        assert_eq!(
            parse("banana^2.5").unwrap(),
            Query::term("text", "banana").boosted(2.5)
        );
    }

    #[test]
    fn test_match_all() {
        assert_eq!(parse("*").unwrap(), Query::MatchAll);
        assert_eq!(parse("*:*").unwrap(), Query::MatchAll);
        assert_eq!(parse("title:*").unwrap(), Query::wildcard("title", "*"));
    }

    #[test]
    fn test_ranges() {
        let query = parse("year:[2020 TO *}").unwrap();
        assert_eq!(
            query,
            Query::Range {
                field: "year".into(),
                bounds: RangeBounds {
                    gte: Some(RangeValue::Long(2020)),
                    ..Default::default()
                },
            }
        );

        let query = parse("title:{apple TO cherry]").unwrap();
        match query {
            Query::Range { bounds, .. } => {
                assert_eq!(bounds.gt, Some(RangeValue::String("apple".into())));
                assert_eq!(bounds.lte, Some(RangeValue::String("cherry".into())));
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_unanalyzed_field_keeps_raw_text() {
        assert_eq!(parse("year:2024").unwrap(), Query::term("year", "2024"));
    }

    #[test]
    fn test_hyphenated_word_becomes_phrase() {
        let query = parse("wi-fi").unwrap();
        assert!(matches!(query, Query::Phrase { .. }));
    }

    #[test]
    fn test_custom_default_field() {
        let schema = schema();
        let query = QueryStringParser::new("dogs", &schema)
            .unwrap()
            .with_default_field("title")
            .parse()
            .unwrap();
        assert_eq!(query, Query::term("title", "dog"));
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("(banana AND over").is_err());
        assert!(parse("banana)").is_err());
        assert!(parse("year:[1 2]").is_err());
        assert!(parse("title:").is_err());
    }
}
