//! Tag insertion into stored field values

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::offsets::Offset;
use crate::config::HighlightConfig;

/// Treatment of offsets that do not fit cleanly inside one value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Cut the offset down to the part inside the value and after the last tag
    #[default]
    Clamp,
    /// Drop the offset for that value
    Reject,
}

/// Maps merged document offsets back onto the stored values of a field
///
/// The values were indexed back to back with `offset_gap` characters
/// between them, so value `i` covers `[value_start, value_start + len)` of
/// the document's offset space.
#[derive(Clone, Copy, Debug)]
pub struct HighlightRenderer {
    offset_gap: usize,
    policy: OverlapPolicy,
}

impl Default for HighlightRenderer {
    fn default() -> Self {
        Self::new(1, OverlapPolicy::Clamp)
    }
}

impl HighlightRenderer {
    pub fn new(offset_gap: usize, policy: OverlapPolicy) -> Self {
        Self { offset_gap, policy }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::new(config.offset_gap, config.overlap_policy)
    }

    /// Render every value that received at least one tag, in value order
    ///
    /// `merged` must be sorted and free of overlaps.
    pub fn render<S: AsRef<str>>(&self, values: &[S], merged: &[Offset]) -> Vec<String> {
        let mut rendered = Vec::new();
        let mut value_start = 0;
        // offsets ending before the current value are never looked at again
        let mut first = 0;

        for value in values {
            let value = value.as_ref();
            let boundaries: Vec<usize> = value
                .char_indices()
                .map(|(byte, _)| byte)
                .chain(std::iter::once(value.len()))
                .collect();
            let len = boundaries.len() - 1;
            let value_end = value_start + len;

            while merged.get(first).is_some_and(|o| o.end <= value_start) {
                first += 1;
            }

            let mut out = String::with_capacity(value.len() + 16);
            let mut cursor = 0;
            let mut tagged = false;

            for offset in merged[first..]
                .iter()
                .take_while(|o| o.start < value_end)
                .filter(|o| o.end > value_start)
            {
                let start = offset.start.saturating_sub(value_start);
                let end = (offset.end - value_start).min(len);
                let straddles = offset.start < value_start || offset.end > value_end;

                if self.policy == OverlapPolicy::Reject && (straddles || start < cursor) {
                    debug!(
                        start = offset.start,
                        end = offset.end,
                        value_start,
                        value_end,
                        "offset does not fit its value, skipped"
                    );
                    continue;
                }

                let start = start.max(cursor);
                if end <= start {
                    continue;
                }

                out.push_str(&value[boundaries[cursor]..boundaries[start]]);
                out.push_str(offset.task.pre_tag());
                out.push_str(&value[boundaries[start]..boundaries[end]]);
                out.push_str(offset.task.post_tag());
                cursor = end;
                tagged = true;
            }

            if tagged {
                out.push_str(&value[boundaries[cursor]..]);
                rendered.push(out);
            }

            value_start = value_end + self.offset_gap;
        }

        rendered
    }
}
