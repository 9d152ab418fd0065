//! Ordered list of unloaded index ranges.
//!
//! Gaps live in an arena and link to their neighbours by [`GapId`], so the
//! list owns every record while traversal stays cheap in both directions.
//! Loaded ranges are never stored: they are whatever lies between and around
//! the gaps.

use pageless_core::{IndexRange, PagelessError, PagelessResult};
use serde::Serialize;
use std::fmt;

/// Stable identifier of a gap.
///
/// Slots are recycled, so the generation tells a live gap apart from an
/// earlier occupant of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GapId {
    index: u32,
    generation: u32,
}

impl fmt::Display for GapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gap#{}v{}", self.index, self.generation)
    }
}

/// A contiguous unloaded range and the placeholder standing in for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Gap<P> {
    pub start: usize,
    pub end: usize,
    pub placeholder: P,
    previous: Option<GapId>,
    next: Option<GapId>,
}

impl<P> Gap<P> {
    pub fn range(&self) -> IndexRange {
        IndexRange::new(self.start, self.end)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// A gap with `end <= start` must not stay in the list.
    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start
    }

    /// Height the placeholder needs to keep scroll geometry intact.
    pub fn placeholder_size(&self, item_size: f64) -> f64 {
        self.len() as f64 * item_size
    }

    pub fn previous(&self) -> Option<GapId> {
        self.previous
    }

    pub fn next(&self) -> Option<GapId> {
        self.next
    }
}

/// Result of shrinking a gap from one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shrunk<P> {
    /// The gap survived and its placeholder needs resizing.
    Resized,
    /// The gap became degenerate and was unlinked; its placeholder is returned
    /// so the caller can discard it.
    Removed(P),
}

/// Result of splitting a gap around a loaded middle range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<P> {
    /// The new gap covering `[mid + filled, end)`.
    pub sibling: GapId,
    /// Placeholder of the original gap when the split left it degenerate.
    pub removed: Option<P>,
}

#[derive(Debug, Clone)]
struct Slot<P> {
    generation: u32,
    gap: Option<Gap<P>>,
}

/// The ordered collection of gaps partitioning unloaded space in `[0, count)`.
#[derive(Debug, Clone)]
pub struct GapList<P> {
    count: usize,
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    root: Option<GapId>,
    live: usize,
}

impl<P: Copy> GapList<P> {
    /// A list with a single gap covering `[0, count)`.
    ///
    /// An empty dataset produces an empty list and `placeholder` is dropped.
    pub fn new(count: usize, placeholder: P) -> Self {
        let mut list = Self::empty(count);
        if count > 0 {
            list.slots.push(Slot {
                generation: 0,
                gap: Some(Gap {
                    start: 0,
                    end: count,
                    placeholder,
                    previous: None,
                    next: None,
                }),
            });
            list.root = Some(GapId {
                index: 0,
                generation: 0,
            });
            list.live = 1;
        }
        list
    }

    /// A list over `[0, count)` with nothing left to load.
    pub fn empty(count: usize) -> Self {
        Self {
            count,
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            live: 0,
        }
    }

    /// Total size of the index space.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn root(&self) -> Option<GapId> {
        self.root
    }

    /// Number of live gaps.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True once every index has been loaded.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: GapId) -> Option<&Gap<P>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.gap.as_ref())
    }

    fn get_mut(&mut self, id: GapId) -> Option<&mut Gap<P>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.gap.as_mut())
    }

    fn require(&self, id: GapId) -> PagelessResult<&Gap<P>> {
        self.get(id)
            .ok_or_else(|| PagelessError::GapNotFound(id.to_string()))
    }

    /// Whether `id` still names a gap in the list.
    pub fn contains(&self, id: GapId) -> bool {
        self.get(id).is_some()
    }

    /// Gaps in index order, starting from the root.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            list: self,
            cursor: self.root,
        }
    }

    /// Gaps in reverse index order.
    pub fn iter_rev(&self) -> impl Iterator<Item = (GapId, &Gap<P>)> + '_ {
        let last = self.iter().last().map(|(id, _)| id);
        std::iter::successors(last, move |id| self.get(*id).and_then(|gap| gap.previous))
            .filter_map(move |id| self.get(id).map(|gap| (id, gap)))
    }

    /// Unloaded ranges in index order.
    pub fn ranges(&self) -> Vec<IndexRange> {
        self.iter().map(|(_, gap)| gap.range()).collect()
    }

    /// Loaded ranges, i.e. the complement of the gaps within `[0, count)`.
    pub fn loaded_ranges(&self) -> Vec<IndexRange> {
        let mut loaded = Vec::new();
        let mut cursor = 0;
        for (_, gap) in self.iter() {
            if gap.start > cursor {
                loaded.push(IndexRange::new(cursor, gap.start));
            }
            cursor = gap.end;
        }
        if cursor < self.count {
            loaded.push(IndexRange::new(cursor, self.count));
        }
        loaded
    }

    /// Number of items not yet loaded.
    pub fn unloaded_items(&self) -> usize {
        self.iter().map(|(_, gap)| gap.len()).sum()
    }

    /// Advance the gap's start by `n` items.
    pub fn shrink_from_start(&mut self, id: GapId, n: usize) -> PagelessResult<Shrunk<P>> {
        let len = self.require(id)?.len();
        if n > len {
            return Err(PagelessError::Invariant(format!(
                "cannot shrink {} by {} items, only {} remain",
                id, n, len
            )));
        }
        if let Some(gap) = self.get_mut(id) {
            gap.start += n;
        }
        Ok(self.unlink_if_degenerate(id))
    }

    /// Pull the gap's end back by `n` items.
    pub fn shrink_from_end(&mut self, id: GapId, n: usize) -> PagelessResult<Shrunk<P>> {
        let len = self.require(id)?.len();
        if n > len {
            return Err(PagelessError::Invariant(format!(
                "cannot shrink {} by {} items, only {} remain",
                id, n, len
            )));
        }
        if let Some(gap) = self.get_mut(id) {
            gap.end -= n;
        }
        Ok(self.unlink_if_degenerate(id))
    }

    /// Mark `[mid, mid + filled)` as loaded, splitting the gap in two.
    ///
    /// The new sibling covers `[mid + filled, end)` and is linked directly
    /// after `id`; the original is truncated to `[start, mid)` and unlinked if
    /// that leaves it empty.
    pub fn split_at(
        &mut self,
        id: GapId,
        mid: usize,
        filled: usize,
        sibling_placeholder: P,
    ) -> PagelessResult<Split<P>> {
        let gap = self.require(id)?;
        let (start, end, next) = (gap.start, gap.end, gap.next);
        if mid < start || mid + filled >= end {
            return Err(PagelessError::Invariant(format!(
                "cannot split {} at {} filling {}: outside {}",
                id,
                mid,
                filled,
                IndexRange::new(start, end)
            )));
        }

        let sibling = self.allocate(Gap {
            start: mid + filled,
            end,
            placeholder: sibling_placeholder,
            previous: Some(id),
            next,
        })?;
        if let Some(next_id) = next {
            if let Some(next_gap) = self.get_mut(next_id) {
                next_gap.previous = Some(sibling);
            }
        }
        if let Some(gap) = self.get_mut(id) {
            gap.end = mid;
            gap.next = Some(sibling);
        }

        let removed = match self.unlink_if_degenerate(id) {
            Shrunk::Removed(placeholder) => Some(placeholder),
            Shrunk::Resized => None,
        };
        Ok(Split { sibling, removed })
    }

    /// Verify ordering, disjointness, link symmetry and bounds.
    pub fn check_invariants(&self) -> PagelessResult<()> {
        let mut previous: Option<(GapId, IndexRange)> = None;
        let mut seen = 0;
        for (id, gap) in self.iter() {
            if gap.is_degenerate() {
                return Err(PagelessError::Invariant(format!(
                    "{} is degenerate: {}",
                    id,
                    gap.range()
                )));
            }
            if gap.end > self.count {
                return Err(PagelessError::Invariant(format!(
                    "{} ends past count {}",
                    id, self.count
                )));
            }
            if gap.previous != previous.map(|(prev_id, _)| prev_id) {
                return Err(PagelessError::Invariant(format!(
                    "{} has a broken back link",
                    id
                )));
            }
            if let Some((prev_id, prev_range)) = previous {
                if prev_range.end > gap.start {
                    return Err(PagelessError::Invariant(format!(
                        "{} {} overlaps or precedes {} {}",
                        id,
                        gap.range(),
                        prev_id,
                        prev_range
                    )));
                }
            }
            previous = Some((id, gap.range()));
            seen += 1;
        }
        if seen != self.live {
            return Err(PagelessError::Invariant(format!(
                "{} gaps reachable from root, {} live",
                seen, self.live
            )));
        }
        Ok(())
    }

    fn allocate(&mut self, gap: Gap<P>) -> PagelessResult<GapId> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.gap = Some(gap);
            self.live += 1;
            return Ok(GapId {
                index,
                generation: slot.generation,
            });
        }
        let index = slot_index(self.slots.len())?;
        self.slots.push(Slot {
            generation: 0,
            gap: Some(gap),
        });
        self.live += 1;
        Ok(GapId {
            index,
            generation: 0,
        })
    }

    fn unlink_if_degenerate(&mut self, id: GapId) -> Shrunk<P> {
        match self.get(id) {
            Some(gap) if gap.is_degenerate() => {}
            _ => return Shrunk::Resized,
        }

        let slot = &mut self.slots[id.index as usize];
        let Some(gap) = slot.gap.take() else {
            return Shrunk::Resized;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;

        match gap.previous {
            Some(prev_id) => {
                if let Some(prev) = self.get_mut(prev_id) {
                    prev.next = gap.next;
                }
            }
            None => self.root = gap.next,
        }
        if let Some(next_id) = gap.next {
            if let Some(next) = self.get_mut(next_id) {
                next.previous = gap.previous;
            }
        }

        Shrunk::Removed(gap.placeholder)
    }
}

/// Index for a slot appended to an arena of `len` slots.
fn slot_index(len: usize) -> PagelessResult<u32> {
    u32::try_from(len).map_err(|_| {
        PagelessError::Invariant(format!("gap arena is full at {} slots", len))
    })
}

/// Forward traversal from the root following `next` links.
#[derive(Debug)]
pub struct Iter<'a, P> {
    list: &'a GapList<P>,
    cursor: Option<GapId>,
}

impl<'a, P: Copy> Iterator for Iter<'a, P> {
    type Item = (GapId, &'a Gap<P>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let gap = self.list.get(id)?;
        self.cursor = gap.next;
        Some((id, gap))
    }
}
