//! In-memory single-document index
//!
//! Holds the analyzed postings of one document and evaluates span queries
//! against them. Every index is built for one document, highlighted, and
//! dropped, so the document is always doc 0.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use tracing::{debug, trace};

use super::{
    AnalysisEngine, DocumentIndex, FieldText, LeafHit, MatchTree, SpanCollector, Spans,
    NO_MORE_DOCS, NO_MORE_POSITIONS, UNPOSITIONED,
};
use crate::config::HighlightConfig;
use crate::error::HighlightError;
use crate::query::{
    NoBulkScoringQuery, Occur, Query, QueryRewriter, RewrittenQuery, SpanQuery, TermPattern,
};
use crate::Result;

/// The only document of a memory index
const DOC: i32 = 0;

/// Builds [`MemoryIndex`]es
#[derive(Clone, Copy, Debug)]
pub struct MemoryEngine {
    /// Positions inserted between successive values of a field
    position_increment_gap: u32,
    /// Characters inserted between successive values of a field
    offset_gap: usize,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self {
            position_increment_gap: 0,
            offset_gap: 1,
        }
    }
}

impl MemoryEngine {
    pub fn new(position_increment_gap: u32, offset_gap: usize) -> Self {
        Self {
            position_increment_gap,
            offset_gap,
        }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::new(config.position_increment_gap, config.offset_gap)
    }
}

impl AnalysisEngine for MemoryEngine {
    type Index = MemoryIndex;

    fn build_index(&self, values: &[FieldText]) -> Result<MemoryIndex> {
        let mut index = MemoryIndex::default();
        for value in values {
            index
                .fields
                .entry(value.field.clone())
                .or_default()
                .add_value(value, self.position_increment_gap, self.offset_gap);
        }
        Ok(index)
    }
}

/// One occurrence of a term
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Posting {
    position: u32,
    start: usize,
    end: usize,
}

/// Postings of one (possibly multi-valued) field
#[derive(Debug, Default)]
struct FieldPostings {
    /// Term dictionary, sorted so patterns can scan from their literal prefix
    terms: BTreeMap<String, Vec<Posting>>,
    values: usize,
    next_position: u32,
    next_offset: usize,
}

impl FieldPostings {
    fn add_value(&mut self, value: &FieldText, position_gap: u32, offset_gap: usize) {
        let (base_position, base_offset) = if self.values == 0 {
            (0, 0)
        } else {
            (
                self.next_position + position_gap,
                self.next_offset + offset_gap,
            )
        };

        let (tokens, consumed) = value.analyzer.analyze_value(&value.text);
        trace!(
            field = %value.field,
            value = self.values,
            tokens = tokens.len(),
            positions = consumed,
            base_offset,
            "indexing field value"
        );

        for token in tokens {
            self.terms.entry(token.term).or_default().push(Posting {
                position: base_position + token.position,
                start: base_offset + token.start,
                end: base_offset + token.end,
            });
        }

        self.values += 1;
        self.next_position = base_position + consumed;
        self.next_offset = base_offset + value.text.chars().count();
    }
}

/// A span match with the leaf occurrences that produced it
#[derive(Clone, Debug)]
struct SpanMatch {
    start: u32,
    end: u32,
    leaves: Vec<Leaf>,
}

#[derive(Clone, Debug)]
struct Leaf {
    field: String,
    term: String,
    start: usize,
    end: usize,
}

/// A clause of a near query: a fixed-width hole or a list of matches
enum NearClause {
    Gap(u32),
    Matches(Vec<SpanMatch>),
}

/// Ephemeral index over one document
#[derive(Debug, Default)]
pub struct MemoryIndex {
    fields: HashMap<String, FieldPostings>,
}

impl MemoryIndex {
    /// Indexed terms of a field, in sorted order
    pub fn terms<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .get(field)
            .into_iter()
            .flat_map(|postings| postings.terms.keys().map(String::as_str))
    }

    /// Number of values indexed for a field
    pub fn value_count(&self, field: &str) -> usize {
        self.fields.get(field).map_or(0, |f| f.values)
    }

    fn evaluate(&self, query: &RewrittenQuery, lagging: bool) -> Result<Option<MatchTree>> {
        let doc = if lagging { UNPOSITIONED } else { DOC };
        match query {
            RewrittenQuery::Span(reporting) => {
                let matches = self.span_matches(reporting.query(), true)?;
                if matches.is_empty() {
                    return Ok(None);
                }
                Ok(Some(MatchTree::Spans(Box::new(MemorySpans::new(
                    matches, doc,
                )))))
            }
            RewrittenQuery::DisjunctionMax { disjuncts, .. } => {
                let mut children = Vec::new();
                for disjunct in disjuncts {
                    if let Some(child) = self.evaluate(disjunct, lagging)? {
                        children.push(child);
                    }
                }
                Ok((!children.is_empty()).then_some(MatchTree::DisjunctionMax { doc, children }))
            }
            RewrittenQuery::Boolean(bool_query) => self.evaluate_boolean(bool_query, lagging),
            RewrittenQuery::Unrewritten(query) => {
                if !self.matches(query)? {
                    return Ok(None);
                }
                // A plain boolean query is scored in bulk and hides its clauses
                Ok(Some(match query {
                    Query::Boolean(_) => MatchTree::Bulk { doc },
                    _ => MatchTree::Opaque { doc },
                }))
            }
        }
    }

    /// Required clauses are positioned on the document, optional clauses are
    /// left lagging behind it and prohibited clauses are dropped.
    fn evaluate_boolean(
        &self,
        query: &NoBulkScoringQuery,
        lagging: bool,
    ) -> Result<Option<MatchTree>> {
        let mut children = Vec::new();
        let mut required = 0;

        for clause in query.clauses_with(Occur::Must) {
            required += 1;
            match self.evaluate(clause, lagging)? {
                Some(child) => children.push(child),
                None => return Ok(None),
            }
        }

        for clause in query.clauses_with(Occur::MustNot) {
            if self.evaluate(clause, false)?.is_some() {
                return Ok(None);
            }
        }

        let mut optional = 0;
        let mut matched = 0;
        for clause in query.clauses_with(Occur::Should) {
            optional += 1;
            if let Some(child) = self.evaluate(clause, true)? {
                matched += 1;
                children.push(child);
            }
        }

        if !minimum_should_match_met(&query.minimum_should_match, required, optional, matched) {
            return Ok(None);
        }

        let doc = if lagging { UNPOSITIONED } else { DOC };
        Ok(Some(MatchTree::Boolean { doc, children }))
    }

    /// Whether the document matches a query, without collecting positions
    fn matches(&self, query: &Query) -> Result<bool> {
        match query {
            Query::MatchAll => Ok(true),
            Query::Range { field, bounds } => {
                Ok(self.terms(field).any(|term| bounds.contains_term(term)))
            }
            Query::Boolean(bool_query) => {
                let mut required = 0;
                let mut optional = 0;
                let mut matched = 0;
                for clause in &bool_query.clauses {
                    let hit = self.matches(&clause.query)?;
                    match clause.occur {
                        Occur::Must if !hit => return Ok(false),
                        Occur::MustNot if hit => return Ok(false),
                        Occur::Must => required += 1,
                        Occur::MustNot => {}
                        Occur::Should => {
                            optional += 1;
                            matched += usize::from(hit);
                        }
                    }
                }
                Ok(minimum_should_match_met(
                    &bool_query.minimum_should_match,
                    required,
                    optional,
                    matched,
                ))
            }
            Query::DisjunctionMax { disjuncts, .. } => {
                for disjunct in disjuncts {
                    if self.matches(disjunct)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Query::Boost { query, .. } => self.matches(query),
            Query::Span(span) => Ok(!self.span_matches(span, false)?.is_empty()),
            Query::Term(_)
            | Query::Phrase { .. }
            | Query::MultiPhrase { .. }
            | Query::MultiTerm { .. }
            | Query::Disjunction { .. } => {
                let rewritten = QueryRewriter::new().rewrite(query)?;
                Ok(self.evaluate(&rewritten, false)?.is_some())
            }
        }
    }

    /// All matches of a span query, sorted by start then end
    ///
    /// Leaves are only recorded when `reporting` is set.
    fn span_matches(&self, query: &SpanQuery, reporting: bool) -> Result<Vec<SpanMatch>> {
        match query {
            SpanQuery::Term(term) => Ok(self.term_matches(&term.field, &term.text, reporting)),
            SpanQuery::MultiTerm { field, pattern } => {
                self.multi_term_matches(field, pattern, reporting)
            }
            SpanQuery::Or(clauses) => {
                let mut matches = Vec::new();
                for clause in clauses {
                    matches.extend(self.span_matches(clause, reporting)?);
                }
                sort_matches(&mut matches);
                Ok(matches)
            }
            SpanQuery::Near {
                clauses,
                slop,
                in_order,
                ..
            } => {
                let mut near_clauses = Vec::with_capacity(clauses.len());
                for clause in clauses {
                    near_clauses.push(match clause {
                        SpanQuery::Gap(width) if *in_order => NearClause::Gap(*width),
                        SpanQuery::Gap(_) => {
                            return Err(HighlightError::QueryExecution(format!(
                                "gaps can only be used in ordered near queries: {}",
                                query
                            )))
                        }
                        other => {
                            let matches = self.span_matches(other, reporting)?;
                            if matches.is_empty() {
                                return Ok(Vec::new());
                            }
                            NearClause::Matches(matches)
                        }
                    });
                }

                if *in_order {
                    ordered_near(query, near_clauses, *slop)
                } else {
                    Ok(unordered_near(
                        near_clauses
                            .into_iter()
                            .filter_map(|c| match c {
                                NearClause::Matches(m) => Some(m),
                                NearClause::Gap(_) => None,
                            })
                            .collect(),
                        *slop,
                    ))
                }
            }
            SpanQuery::Gap(width) => Err(HighlightError::QueryExecution(format!(
                "a gap of width {} can only be a clause of an ordered near query",
                width
            ))),
        }
    }

    fn term_matches(&self, field: &str, text: &str, reporting: bool) -> Vec<SpanMatch> {
        self.fields
            .get(field)
            .and_then(|f| f.terms.get(text))
            .map(|postings| {
                postings
                    .iter()
                    .map(|p| single_match(field, text, p, reporting))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn multi_term_matches(
        &self,
        field: &str,
        pattern: &TermPattern,
        reporting: bool,
    ) -> Result<Vec<SpanMatch>> {
        let Some(postings) = self.fields.get(field) else {
            return Ok(Vec::new());
        };

        let matcher = pattern.matcher()?;
        let prefix = pattern.literal_prefix();
        let limit = pattern.max_expansions();

        let mut expanded = 0;
        let mut matches = Vec::new();
        for (term, term_postings) in postings
            .terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(term, _)| term.starts_with(prefix))
            .filter(|(term, _)| matcher.matches(term))
        {
            if expanded == limit {
                debug!(field, pattern = %pattern, limit, "term expansion truncated");
                break;
            }
            expanded += 1;
            matches.extend(
                term_postings
                    .iter()
                    .map(|p| single_match(field, term, p, reporting)),
            );
        }

        sort_matches(&mut matches);
        Ok(matches)
    }
}

impl DocumentIndex for MemoryIndex {
    fn search(&self, query: &RewrittenQuery) -> Result<Option<MatchTree>> {
        self.evaluate(query, false)
    }
}

fn single_match(field: &str, term: &str, posting: &Posting, reporting: bool) -> SpanMatch {
    let leaves = if reporting {
        vec![Leaf {
            field: field.to_string(),
            term: term.to_string(),
            start: posting.start,
            end: posting.end,
        }]
    } else {
        Vec::new()
    };
    SpanMatch {
        start: posting.position,
        end: posting.position + 1,
        leaves,
    }
}

fn sort_matches(matches: &mut [SpanMatch]) {
    matches.sort_by_key(|m| (m.start, m.end));
}

/// Optional clauses needed: the explicit minimum, else one when nothing is
/// required. A query with neither kind of clause matches nothing.
fn minimum_should_match_met(
    minimum: &Option<crate::query::MinimumShouldMatch>,
    required: usize,
    optional: usize,
    matched: usize,
) -> bool {
    if required == 0 && optional == 0 {
        return false;
    }
    let needed = match minimum {
        Some(msm) => msm.calculate(optional),
        None if required == 0 => 1,
        None => 0,
    };
    matched >= needed
}

/// Ordered near: each clause starts at or after the previous clause's end
///
/// For every match of the first clause, later clauses take their earliest
/// match that keeps the order. Gaps advance the required start by their
/// width. The match is kept when the positions skipped between clauses do
/// not exceed `slop`.
fn ordered_near(query: &SpanQuery, clauses: Vec<NearClause>, slop: u32) -> Result<Vec<SpanMatch>> {
    let mut clauses = clauses.into_iter();
    let first = match clauses.next() {
        None => return Ok(Vec::new()),
        Some(NearClause::Matches(matches)) => matches,
        Some(NearClause::Gap(_)) => {
            return Err(HighlightError::QueryExecution(format!(
                "a near query cannot start with a gap: {}",
                query
            )))
        }
    };
    let rest: Vec<NearClause> = clauses.collect();

    let mut out = Vec::new();
    'outer: for head in first {
        let mut end = head.end;
        let mut skipped = 0;
        let mut leaves = head.leaves;

        for clause in &rest {
            match clause {
                NearClause::Gap(width) => end += width,
                NearClause::Matches(matches) => {
                    let idx = matches.partition_point(|m| m.start < end);
                    let Some(next) = matches.get(idx) else {
                        // A later head may be shorter, so keep trying
                        continue 'outer;
                    };
                    skipped += next.start - end;
                    end = next.end;
                    leaves.extend(next.leaves.iter().cloned());
                }
            }
        }

        if skipped <= slop {
            out.push(SpanMatch {
                start: head.start,
                end,
                leaves,
            });
        }
    }
    Ok(out)
}

/// Unordered near: all clauses within a window whose unused positions do
/// not exceed `slop`
///
/// Walks the clauses together, always advancing the one that starts first.
/// Clause spans in a window may not overlap, so one occurrence never fills
/// two clauses.
fn unordered_near(clauses: Vec<Vec<SpanMatch>>, slop: u32) -> Vec<SpanMatch> {
    let mut out = Vec::new();
    if clauses.is_empty() {
        return out;
    }

    let mut cursors = vec![0usize; clauses.len()];
    while cursors
        .iter()
        .zip(&clauses)
        .all(|(&cursor, matches)| cursor < matches.len())
    {
        let cells: Vec<&SpanMatch> = cursors
            .iter()
            .zip(&clauses)
            .map(|(&cursor, matches)| &matches[cursor])
            .collect();

        let min_start = cells.iter().map(|m| m.start).min().unwrap_or(0);
        let max_end = cells.iter().map(|m| m.end).max().unwrap_or(0);
        let covered: u32 = cells.iter().map(|m| m.end - m.start).sum();
        if !cells_overlap(&cells) && max_end - min_start <= covered + slop {
            out.push(SpanMatch {
                start: min_start,
                end: max_end,
                leaves: cells.iter().flat_map(|m| m.leaves.iter().cloned()).collect(),
            });
        }

        let lead = (0..cells.len())
            .min_by_key(|&i| (cells[i].start, cells[i].end, i))
            .unwrap_or(0);
        cursors[lead] += 1;
    }

    sort_matches(&mut out);
    out
}

fn cells_overlap(cells: &[&SpanMatch]) -> bool {
    cells.iter().enumerate().any(|(i, a)| {
        cells[i + 1..]
            .iter()
            .any(|b| a.start < b.end && b.start < a.end)
    })
}

/// Span iterator over precomputed matches
struct MemorySpans {
    doc: i32,
    matches: Vec<SpanMatch>,
    /// Index of the current match; `None` until the first `next_start_position`
    current: Option<usize>,
}

impl MemorySpans {
    fn new(matches: Vec<SpanMatch>, doc: i32) -> Self {
        Self {
            doc,
            matches,
            current: None,
        }
    }

    fn current_match(&self) -> Option<&SpanMatch> {
        self.current.and_then(|idx| self.matches.get(idx))
    }
}

impl Spans for MemorySpans {
    fn doc_id(&self) -> i32 {
        self.doc
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        if self.doc != UNPOSITIONED && self.doc >= target {
            return Ok(self.doc);
        }
        self.doc = if target <= DOC && !self.matches.is_empty() {
            DOC
        } else {
            NO_MORE_DOCS
        };
        self.current = None;
        Ok(self.doc)
    }

    fn next_start_position(&mut self) -> Result<i32> {
        if self.doc != DOC {
            return Err(HighlightError::QueryExecution(format!(
                "span iterator is not positioned on a document (doc {})",
                self.doc
            )));
        }
        let next = self.current.map_or(0, |idx| idx + 1);
        self.current = Some(next.min(self.matches.len()));
        Ok(self.start_position())
    }

    fn start_position(&self) -> i32 {
        match self.current {
            None => UNPOSITIONED,
            Some(_) => self
                .current_match()
                .map_or(NO_MORE_POSITIONS, |m| m.start as i32),
        }
    }

    fn end_position(&self) -> i32 {
        match self.current {
            None => UNPOSITIONED,
            Some(_) => self
                .current_match()
                .map_or(NO_MORE_POSITIONS, |m| m.end as i32),
        }
    }

    fn collect(&mut self, collector: &mut dyn SpanCollector) -> Result<()> {
        if let Some(current) = self.current_match() {
            for leaf in &current.leaves {
                collector.collect_leaf(LeafHit {
                    field: &leaf.field,
                    term: &leaf.term,
                    start: leaf.start,
                    end: leaf.end,
                });
            }
        }
        Ok(())
    }
}
