//! Property-based tests using proptest.
//!
//! Merging, rendering and end-to-end highlighting invariants checked on
//! randomly generated offsets and documents.

use std::sync::Arc;

use proptest::prelude::*;
use spanlight::config::{HighlightConfig, TokenizerConfig};
use spanlight::highlight::{merge_offsets, HighlightRenderer, HighlightingTask, Offset, SpanHighlighter};
use spanlight::query::{RewrittenQuery, SpanQuery};
use spanlight::schema::Schema;
use spanlight::Document;

// ============================================================================
// STRATEGIES
// ============================================================================

fn task(priority: i32) -> Arc<HighlightingTask> {
    Arc::new(HighlightingTask::new(
        priority,
        RewrittenQuery::span(SpanQuery::term("text", "x")),
        "[",
        "]",
    ))
}

/// (start, length, priority) triples
fn offsets_strategy() -> impl Strategy<Value = Vec<(usize, usize, i32)>> {
    prop::collection::vec((0usize..120, 0usize..12, 0i32..4), 0..20)
}

fn build_offsets(raw: &[(usize, usize, i32)]) -> Vec<Offset> {
    let tasks: Vec<Arc<HighlightingTask>> = (0..4).map(task).collect();
    raw.iter()
        .map(|&(start, len, priority)| {
            Offset::new(start, start + len, tasks[priority as usize].clone())
        })
        .collect()
}

fn spans(offsets: &[Offset]) -> Vec<(usize, usize, i32)> {
    offsets
        .iter()
        .map(|o| (o.start, o.end, o.task.priority()))
        .collect()
}

fn word_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "apple".to_string(),
        "banana".to_string(),
        "cherry".to_string(),
        "date".to_string(),
        "café".to_string(),
        "über".to_string(),
    ])
}

/// Field values made of known words
fn values_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::collection::vec(word_strategy(), 1..6).prop_map(|words| words.join(" ")),
        1..4,
    )
}

// ============================================================================
// MERGE PROPERTIES
// ============================================================================

proptest! {
    /// Property: merged offsets are sorted and separated by at least one character.
    #[test]
    fn prop_merge_output_is_disjoint(raw in offsets_strategy()) {
        let merged = merge_offsets(&build_offsets(&raw));
        for pair in merged.windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }

    /// Property: merging twice changes nothing.
    #[test]
    fn prop_merge_is_idempotent(raw in offsets_strategy()) {
        let once = merge_offsets(&build_offsets(&raw));
        let twice = merge_offsets(&once);
        prop_assert_eq!(spans(&once), spans(&twice));
    }

    /// Property: every input lies inside exactly one merged offset, whose
    /// priority is the lowest of the inputs it absorbed.
    #[test]
    fn prop_merge_covers_inputs_with_lowest_priority(raw in offsets_strategy()) {
        let input = build_offsets(&raw);
        let merged = merge_offsets(&input);

        for offset in &input {
            let covering: Vec<&Offset> = merged
                .iter()
                .filter(|m| m.start <= offset.start && offset.end <= m.end)
                .collect();
            prop_assert_eq!(covering.len(), 1);
        }

        for m in &merged {
            let lowest = input
                .iter()
                .filter(|o| m.start <= o.start && o.end <= m.end)
                .map(|o| o.task.priority())
                .min();
            prop_assert_eq!(Some(m.task.priority()), lowest);
        }
    }

    /// Property: input order does not change the merge result.
    #[test]
    fn prop_merge_ignores_input_order(raw in offsets_strategy()) {
        let mut reversed = raw.clone();
        reversed.reverse();
        let a = merge_offsets(&build_offsets(&raw));
        let b = merge_offsets(&build_offsets(&reversed));
        let ranges = |o: &[Offset]| o.iter().map(|x| (x.start, x.end)).collect::<Vec<_>>();
        prop_assert_eq!(ranges(&a), ranges(&b));
        let priorities = |o: &[Offset]| o.iter().map(|x| x.task.priority()).collect::<Vec<_>>();
        prop_assert_eq!(priorities(&a), priorities(&b));
    }
}

// ============================================================================
// RENDERING PROPERTIES
// ============================================================================

proptest! {
    /// Property: removing the tags from a rendered value gives back the value.
    #[test]
    fn prop_render_preserves_text(values in values_strategy(), raw in offsets_strategy()) {
        let merged = merge_offsets(&build_offsets(&raw));
        let rendered = HighlightRenderer::default().render(&values, &merged);

        prop_assert!(rendered.len() <= values.len());
        for out in &rendered {
            let stripped: String = out.chars().filter(|c| *c != '[' && *c != ']').collect();
            prop_assert!(values.contains(&stripped));
        }
    }
}

// ============================================================================
// END-TO-END PROPERTIES
// ============================================================================

proptest! {
    /// Property: a term query tags every occurrence of the term, in every value.
    #[test]
    fn prop_every_occurrence_is_tagged(values in values_strategy(), word in word_strategy()) {
        let highlighter = SpanHighlighter::new(
            HighlightConfig::default().with_tags("[", "]"),
            Arc::new(Schema::dynamic(TokenizerConfig::standard())),
        );
        let mut doc = Document::new("p");
        for value in &values {
            doc.add_field("text", value.clone());
        }

        let primary = highlighter.parse_query(&word).unwrap();
        let request = highlighter.request().with_field_list("text");
        let response = highlighter.highlight(&[doc], &primary, &request).unwrap();
        let fields = response.get("p").unwrap();

        let expected: Vec<String> = values
            .iter()
            .filter(|v| v.split(' ').any(|w| w == word))
            .map(|v| {
                v.split(' ')
                    .map(|w| if w == word { format!("[{}]", w) } else { w.to_string() })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();

        if expected.is_empty() {
            prop_assert!(fields.is_empty());
        } else {
            prop_assert_eq!(&fields["text"], &expected);
        }
    }
}
