//! Span extraction from match trees
//!
//! A match tree mirrors the structure of the query that produced it. The
//! span iterators can sit at any depth below boolean and disjunction nodes,
//! and optional clauses may not have been moved onto the matching document
//! yet, so extraction first gathers every iterator and then catches lagging
//! ones up before reading their positions.

use tracing::trace;

use crate::index::{MatchTree, SpanCollector, Spans, NO_MORE_DOCS, NO_MORE_POSITIONS, UNPOSITIONED};
use crate::Result;

/// Every span iterator below `tree`, in depth-first clause order
///
/// Bulk-scored and opaque nodes contribute nothing.
pub fn extract_spans(tree: &mut MatchTree) -> Vec<&mut dyn Spans> {
    let mut out = Vec::new();
    gather(tree, &mut out);
    out
}

fn gather<'a>(tree: &'a mut MatchTree, out: &mut Vec<&'a mut dyn Spans>) {
    match tree {
        MatchTree::Spans(spans) => out.push(spans.as_mut()),
        MatchTree::Boolean { children, .. } | MatchTree::DisjunctionMax { children, .. } => {
            for child in children.iter_mut() {
                gather(child, out);
            }
        }
        MatchTree::Bulk { .. } | MatchTree::Opaque { .. } => {}
    }
}

/// Report every leaf occurrence of every span match on the tree's document
///
/// Returns the number of span positions visited.
pub fn collect_spans(tree: &mut MatchTree, collector: &mut dyn SpanCollector) -> Result<usize> {
    let doc = tree.doc_id();
    if doc == UNPOSITIONED || doc == NO_MORE_DOCS {
        return Ok(0);
    }

    let mut visited = 0;
    for spans in extract_spans(tree) {
        let mut current = spans.doc_id();
        if current < doc {
            current = spans.advance(doc)?;
        }
        if current != doc {
            trace!(doc, current, "span iterator not on the matching document");
            continue;
        }

        loop {
            let start = spans.next_start_position()?;
            if start == NO_MORE_POSITIONS {
                break;
            }
            if start == UNPOSITIONED {
                continue;
            }
            spans.collect(collector)?;
            visited += 1;
        }
    }
    Ok(visited)
}
