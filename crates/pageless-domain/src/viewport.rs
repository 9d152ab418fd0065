//! Visible-window computation and gap intersection.
//!
//! Works purely in pixel space; converting pixels back to item indices is the
//! fill planner's job.

use crate::gap_list::{GapId, GapList};
use pageless_core::IndexRange;
use serde::Serialize;

/// Default look-behind above the viewport, in pixels.
pub const DEFAULT_MARGIN: f64 = 100.0;

/// A half-open pixel range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelRange {
    pub start: f64,
    pub end: f64,
}

impl PixelRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn height(&self) -> f64 {
        self.end - self.start
    }

    /// Translate into a coordinate space whose origin is `origin`.
    pub fn relative_to(&self, origin: f64) -> Self {
        Self {
            start: self.start - origin,
            end: self.end - origin,
        }
    }
}

/// `[scroll_top - margin, scroll_top + viewport_height)`.
pub fn visible_window(scroll_top: f64, viewport_height: f64, margin: f64) -> PixelRange {
    PixelRange::new(scroll_top - margin, scroll_top + viewport_height)
}

/// Overlap of two ranges; ranges that merely touch do not intersect.
pub fn intersect(a: PixelRange, b: PixelRange) -> Option<PixelRange> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    if start >= end {
        return None;
    }
    Some(PixelRange::new(start, end))
}

/// A gap whose placeholder overlaps the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapHit {
    pub gap: GapId,
    /// The gap's index range at scan time.
    pub range: IndexRange,
    /// Placeholder extent in container pixels.
    pub extent: PixelRange,
    /// The intersection, relative to the top of the placeholder.
    pub local: PixelRange,
}

/// Intersect the window with every gap's on-screen extent, in document order.
///
/// `extent_of` reports where a placeholder currently sits, which is the
/// layout surface's measurement capability.
pub fn scan<P, F>(gaps: &GapList<P>, window: PixelRange, mut extent_of: F) -> Vec<GapHit>
where
    P: Copy,
    F: FnMut(P) -> PixelRange,
{
    gaps.iter()
        .filter_map(|(id, gap)| {
            let extent = extent_of(gap.placeholder);
            intersect(window, extent).map(|intersection| GapHit {
                gap: id,
                range: gap.range(),
                extent,
                local: intersection.relative_to(extent.start),
            })
        })
        .collect()
}
