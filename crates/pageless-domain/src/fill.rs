//! Fill-strategy decision for a gap under the viewport.

use crate::gap_list::GapId;
use crate::viewport::GapHit;
use pageless_core::IndexRange;
use serde::Serialize;
use std::fmt;

/// Where in a gap a load is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    /// Load from the gap's first item; content goes before the placeholder.
    Head,
    /// Load up to the gap's last item; content goes after the placeholder.
    Tail,
    /// Load strictly inside the gap, splitting it in two.
    Middle,
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Tail => write!(f, "tail"),
            Self::Middle => write!(f, "middle"),
        }
    }
}

/// One load decided for one gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FillPlan {
    pub gap: GapId,
    /// The gap's range when the plan was made; completion is dropped if the
    /// gap no longer matches it.
    pub expected: IndexRange,
    pub strategy: FillStrategy,
    pub start: usize,
    pub count: usize,
}

impl FillPlan {
    /// The index range this plan loads.
    pub fn range(&self) -> IndexRange {
        IndexRange::from_start(self.start, self.count)
    }
}

/// Items per load: twice the viewport, never less than one.
pub fn page_size(viewport_height: f64, item_size: f64) -> usize {
    let items = (2.0 * viewport_height / item_size).ceil();
    if items.is_finite() && items >= 1.0 {
        items as usize
    } else {
        1
    }
}

/// Decide how to fill the gap described by `hit`.
///
/// Head wins over tail, tail over middle. A middle load that would reach the
/// gap's end is clamped and becomes a tail load, so a split always leaves a
/// non-empty sibling.
///
/// # Panics
///
/// On degenerate geometry (an empty gap or a middle anchor outside the gap),
/// which means the scan arithmetic is broken.
pub fn plan_fill(hit: &GapHit, item_size: f64, page_size: usize) -> FillPlan {
    let gap = hit.range;
    assert!(!gap.is_empty(), "planning a fill for empty gap {}", gap);

    let item_count = page_size.min(gap.len());
    assert!(item_count > 0, "fill of {} would load no items", gap);

    let plan = |strategy, start, count| FillPlan {
        gap: hit.gap,
        expected: gap,
        strategy,
        start,
        count,
    };

    if hit.local.start < item_size {
        return plan(FillStrategy::Head, gap.start, item_count);
    }
    if hit.local.end > hit.extent.height() - item_size {
        return plan(FillStrategy::Tail, gap.end - item_count, item_count);
    }

    // Rounding can land on the row past the gap; the last row is the furthest
    // a middle load may start.
    let offset = ((hit.local.start / item_size).ceil() as usize).min(gap.len() - 1);
    let mid = gap.start + offset;
    assert!(
        gap.start < mid && mid < gap.end,
        "middle anchor {} outside {}",
        mid,
        gap
    );

    let count = page_size.min(gap.end - mid);
    if mid + count >= gap.end {
        return plan(FillStrategy::Tail, mid, count);
    }
    plan(FillStrategy::Middle, mid, count)
}
