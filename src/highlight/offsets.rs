//! Offset collection and priority merging

use std::collections::HashMap;
use std::sync::Arc;

use super::task::HighlightingTask;
use crate::index::{LeafHit, SpanCollector};

/// A highlighted character range and the task that produced it
#[derive(Clone, Debug)]
pub struct Offset {
    pub start: usize,
    pub end: usize,
    pub task: Arc<HighlightingTask>,
}

impl Offset {
    pub fn new(start: usize, end: usize, task: Arc<HighlightingTask>) -> Self {
        Self { start, end, task }
    }

    /// Inclusive overlap: touching ranges count as overlapping
    pub fn overlaps(&self, other: &Offset) -> bool {
        self.end >= other.start && self.start <= other.end
    }
}

/// Per-field offsets of one document, ordered by start
///
/// Offsets with the same start keep their insertion order. Nothing is
/// deduplicated; merging takes care of repeats.
#[derive(Debug, Default)]
pub struct OffsetCollector {
    fields: HashMap<String, Vec<Offset>>,
}

impl OffsetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, offset: Offset) {
        let offsets = self.fields.entry(field.to_string()).or_default();
        let idx = offsets.partition_point(|o| o.start <= offset.start);
        offsets.insert(idx, offset);
    }

    /// A sink that attributes every collected leaf to `task`
    pub fn for_task<'a>(&'a mut self, task: &'a Arc<HighlightingTask>) -> TaskScopedCollector<'a> {
        TaskScopedCollector {
            collector: self,
            task,
            collected: 0,
        }
    }

    /// Move every offset of `other` into this collector
    pub fn absorb(&mut self, other: OffsetCollector) {
        for (field, offsets) in other.fields {
            for offset in offsets {
                self.add(&field, offset);
            }
        }
    }

    pub fn offsets(&self, field: &str) -> &[Offset] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }

    /// Total number of offsets across fields
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }
}

/// Collector bound to one task for the duration of a collection pass
pub struct TaskScopedCollector<'a> {
    collector: &'a mut OffsetCollector,
    task: &'a Arc<HighlightingTask>,
    collected: usize,
}

impl TaskScopedCollector<'_> {
    /// Leaves collected through this sink
    pub fn collected(&self) -> usize {
        self.collected
    }
}

impl SpanCollector for TaskScopedCollector<'_> {
    fn collect_leaf(&mut self, hit: LeafHit<'_>) {
        self.collector
            .add(hit.field, Offset::new(hit.start, hit.end, Arc::clone(self.task)));
        self.collected += 1;
    }
}

/// Merge overlapping offsets in one left-to-right sweep
///
/// Overlapping offsets combine into their union and keep the task with the
/// lower priority number; on a tie the running offset's task stays. The
/// output is sorted and every pair satisfies `a.end < b.start`.
pub fn merge_offsets(offsets: &[Offset]) -> Vec<Offset> {
    let mut sorted = offsets.to_vec();
    sorted.sort_by_key(|o| o.start);

    let mut merged: Vec<Offset> = Vec::with_capacity(sorted.len());
    for offset in sorted {
        match merged.last_mut() {
            Some(current) if current.overlaps(&offset) => {
                current.start = current.start.min(offset.start);
                current.end = current.end.max(offset.end);
                if offset.task.priority() < current.task.priority() {
                    current.task = offset.task;
                }
            }
            _ => merged.push(offset),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{RewrittenQuery, SpanQuery};

    fn task(priority: i32, tag: &str) -> Arc<HighlightingTask> {
        Arc::new(HighlightingTask::new(
            priority,
            RewrittenQuery::span(SpanQuery::term("text", "x")),
            format!("<{}>", tag),
            format!("</{}>", tag),
        ))
    }

    fn spans(offsets: &[Offset]) -> Vec<(usize, usize, i32)> {
        offsets
            .iter()
            .map(|o| (o.start, o.end, o.task.priority()))
            .collect()
    }

    #[test]
    fn test_collector_orders_by_start() {
        let t = task(0, "a");
        let mut collector = OffsetCollector::new();
        collector.add("text", Offset::new(10, 12, t.clone()));
        collector.add("text", Offset::new(2, 4, t.clone()));
        collector.add("title", Offset::new(0, 1, t.clone()));
        collector.add("text", Offset::new(2, 3, t));

        let text = spans(collector.offsets("text"));
        assert_eq!(text, vec![(2, 4, 0), (2, 3, 0), (10, 12, 0)]);
        assert_eq!(collector.len(), 4);
        assert!(collector.offsets("missing").is_empty());
    }

    #[test]
    fn test_task_scoped_collector() {
        let low = task(0, "a");
        let high = task(1, "b");
        let mut collector = OffsetCollector::new();

        let mut scoped = collector.for_task(&high);
        scoped.collect_leaf(LeafHit {
            field: "text",
            term: "banana",
            start: 11,
            end: 17,
        });
        assert_eq!(scoped.collected(), 1);

        let mut scoped = collector.for_task(&low);
        scoped.collect_leaf(LeafHit {
            field: "text",
            term: "banana",
            start: 11,
            end: 17,
        });

        assert_eq!(spans(collector.offsets("text")), vec![(11, 17, 1), (11, 17, 0)]);
    }

    #[test]
    fn test_merge_touching_and_overlapping() {
        let t = task(0, "a");
        let offsets = vec![
            Offset::new(0, 3, t.clone()),
            Offset::new(3, 5, t.clone()),
            Offset::new(7, 9, t.clone()),
            Offset::new(8, 12, t),
        ];
        assert_eq!(spans(&merge_offsets(&offsets)), vec![(0, 5, 0), (7, 12, 0)]);
    }

    #[test]
    fn test_merge_keeps_lower_priority_number() {
        let first = task(0, "a");
        let second = task(1, "b");

        let merged = merge_offsets(&[
            Offset::new(11, 17, second.clone()),
            Offset::new(11, 17, first.clone()),
        ]);
        assert_eq!(spans(&merged), vec![(11, 17, 0)]);
        assert_eq!(merged[0].task.pre_tag(), "<a>");

        let merged = merge_offsets(&[Offset::new(11, 17, first), Offset::new(12, 20, second)]);
        assert_eq!(spans(&merged), vec![(11, 20, 0)]);
    }

    #[test]
    fn test_merge_tie_keeps_running_task() {
        let a = task(1, "a");
        let b = task(1, "b");
        let merged = merge_offsets(&[Offset::new(0, 4, a), Offset::new(2, 6, b)]);
        assert_eq!(merged[0].task.pre_tag(), "<a>");
    }

    #[test]
    fn test_merge_duplicates_and_empty() {
        let t = task(0, "a");
        assert!(merge_offsets(&[]).is_empty());
        let merged = merge_offsets(&[Offset::new(4, 6, t.clone()), Offset::new(4, 6, t)]);
        assert_eq!(spans(&merged), vec![(4, 6, 0)]);
    }
}
