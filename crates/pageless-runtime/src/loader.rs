//! Incremental range loading for one scrollable container.
//!
//! A [`RangeLoader`] owns the gap list, the layout surface and a single
//! pending-load slot. Each [`RangeLoader::update`] scans the viewport, plans
//! a fill for every gap under it and schedules the plans one after another;
//! since scheduling always cancels the pending load first, only the last plan
//! survives. Gaps and layout are only mutated when a load completes.

use crate::task::DebouncedTask;
use crate::traits::{Content, Fetcher, Layout};
use pageless_core::{FetchRequest, IndexRange, LoaderConfig, NodeId, PagelessResult};
use pageless_domain::{
    page_size, plan_fill, scan, visible_window, FillPlan, FillStrategy, GapId, GapList,
    PixelRange, Shrunk,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Outcome of a load, published once per fired load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadEvent {
    /// The range was rendered and the gap shrunk or split.
    Loaded {
        range: IndexRange,
        strategy: FillStrategy,
        received: usize,
    },
    /// The fetch failed; the gap is untouched and the next scan retries it.
    Failed { range: IndexRange, reason: String },
    /// The target gap changed while the fetch was in flight; the result was
    /// dropped.
    Stale { range: IndexRange },
}

/// Serializable view of a loader's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoaderSnapshot {
    pub count: usize,
    pub page_size: usize,
    pub gaps: Vec<IndexRange>,
    pub loaded: Vec<IndexRange>,
    pub unloaded_items: usize,
    pub pending: bool,
}

struct LoaderState<L> {
    layout: L,
    gaps: GapList<NodeId>,
    pending: Option<DebouncedTask>,
}

struct Shared<F, L> {
    config: LoaderConfig,
    count: usize,
    page_size: usize,
    fetcher: F,
    events: broadcast::Sender<LoadEvent>,
    state: Mutex<LoaderState<L>>,
}

/// Loads the slices of a `count`-item list that scroll into view.
pub struct RangeLoader<F, L> {
    shared: Arc<Shared<F, L>>,
}

impl<F, L> Clone for RangeLoader<F, L> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F, L> std::fmt::Debug for RangeLoader<F, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeLoader")
            .field("count", &self.shared.count)
            .field("page_size", &self.shared.page_size)
            .finish_non_exhaustive()
    }
}

impl<F, L> RangeLoader<F, L>
where
    F: Fetcher + 'static,
    L: Layout + 'static,
{
    /// Validate `config`, insert the root placeholder and run the first scan.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        config: LoaderConfig,
        count: usize,
        fetcher: F,
        mut layout: L,
    ) -> PagelessResult<Self> {
        config.validate()?;

        let page_size = page_size(layout.viewport_height(), config.item_size);
        let gaps = if count == 0 {
            GapList::empty(0)
        } else {
            let placeholder = layout.create_placeholder(count as f64 * config.item_size);
            layout.append(placeholder);
            GapList::new(count, placeholder)
        };

        tracing::debug!(count, page_size, url = %config.url, "Mounted range loader");

        let (events, _) = broadcast::channel(64);
        let loader = Self {
            shared: Arc::new(Shared {
                config,
                count,
                page_size,
                fetcher,
                events,
                state: Mutex::new(LoaderState {
                    layout,
                    gaps,
                    pending: None,
                }),
            }),
        };
        loader.update();
        Ok(loader)
    }

    /// Scan the viewport and schedule a load for what it shows.
    ///
    /// Returns every plan made, in document order; only the last one is left
    /// pending.
    pub fn update(&self) -> Vec<FillPlan> {
        let plans = self.plan();
        for plan in &plans {
            self.fill(*plan);
        }
        plans
    }

    /// The fills the current viewport calls for, without scheduling anything.
    pub fn plan(&self) -> Vec<FillPlan> {
        let config = &self.shared.config;
        let guard = self.shared.state.lock();
        let state = &*guard;
        let window = visible_window(
            state.layout.scroll_top(),
            state.layout.viewport_height(),
            config.margin,
        );

        scan(&state.gaps, window, |node| {
            let top = state.layout.offset_top(node);
            PixelRange::new(top, top + state.layout.measure_height(node))
        })
        .iter()
        .map(|hit| plan_fill(hit, config.item_size, self.shared.page_size))
        .collect()
    }

    /// Replace the pending load with one for `plan`.
    pub fn fill(&self, plan: FillPlan) {
        let shared = Arc::clone(&self.shared);
        let request = FetchRequest::new(&shared.config, plan.start, plan.count);

        let mut state = self.shared.state.lock();
        Self::cancel_slot(&mut state);

        tracing::debug!(
            range = %plan.range(),
            strategy = %plan.strategy,
            gap = %plan.gap,
            "Scheduling load"
        );
        state.pending = Some(DebouncedTask::schedule(
            self.shared.config.debounce(),
            move || async move {
                tracing::debug!(
                    url = %request.url,
                    method = %request.method,
                    start = request.start,
                    count = request.count,
                    "Fetching"
                );
                let result = shared.fetcher.fetch(request).await;
                shared.complete(plan, result);
            },
        ));
    }

    /// Cancel the pending load if it has not fired yet.
    pub fn cancel_pending(&self) -> bool {
        let mut state = self.shared.state.lock();
        Self::cancel_slot(&mut state)
    }

    fn cancel_slot(state: &mut LoaderState<L>) -> bool {
        match state.pending.take() {
            Some(task) => {
                let cancelled = task.cancel();
                if cancelled {
                    tracing::debug!("Cancelled pending load");
                }
                cancelled
            }
            None => false,
        }
    }

    /// Re-scan on every scroll event from the layout surface.
    ///
    /// The returned task runs until the layout's scroll channel closes; abort
    /// it to stop observing earlier.
    pub fn observe_scroll(&self) -> JoinHandle<()> {
        let mut scrolls = self.shared.state.lock().layout.subscribe_scroll();
        let loader = self.clone();

        tokio::spawn(async move {
            loop {
                match scrolls.recv().await {
                    Ok(event) => {
                        tracing::trace!(scroll_top = event.scroll_top, "Scrolled");
                        loader.update();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Scroll observer lagged");
                        loader.update();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Subscribe to load outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.shared.config
    }

    pub fn count(&self) -> usize {
        self.shared.count
    }

    /// Items per load, fixed at mount from the viewport height.
    pub fn page_size(&self) -> usize {
        self.shared.page_size
    }

    /// A load is scheduled and has not fired yet.
    pub fn has_pending(&self) -> bool {
        self.shared
            .state
            .lock()
            .pending
            .as_ref()
            .is_some_and(DebouncedTask::is_pending)
    }

    pub fn gaps(&self) -> Vec<IndexRange> {
        self.shared.state.lock().gaps.ranges()
    }

    pub fn loaded_ranges(&self) -> Vec<IndexRange> {
        self.shared.state.lock().gaps.loaded_ranges()
    }

    /// Whether the gap named by `id` is still in the list.
    pub fn is_live(&self, id: GapId) -> bool {
        self.shared.state.lock().gaps.contains(id)
    }

    pub fn snapshot(&self) -> LoaderSnapshot {
        let state = self.shared.state.lock();
        LoaderSnapshot {
            count: self.shared.count,
            page_size: self.shared.page_size,
            gaps: state.gaps.ranges(),
            loaded: state.gaps.loaded_ranges(),
            unloaded_items: state.gaps.unloaded_items(),
            pending: state.pending.as_ref().is_some_and(DebouncedTask::is_pending),
        }
    }
}

impl<F, L: Layout> Shared<F, L> {
    fn complete(&self, plan: FillPlan, result: PagelessResult<Vec<String>>) {
        let event = {
            let mut state = self.state.lock();
            self.apply(&mut state, plan, result)
        };
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn apply(
        &self,
        state: &mut LoaderState<L>,
        plan: FillPlan,
        result: PagelessResult<Vec<String>>,
    ) -> LoadEvent {
        let range = plan.range();
        let items = match result {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    range = %range,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Load failed, gap left for the next scan"
                );
                return LoadEvent::Failed {
                    range,
                    reason: e.to_string(),
                };
            }
        };

        let placeholder = match state.gaps.get(plan.gap) {
            Some(gap) if gap.range() == plan.expected => gap.placeholder,
            _ => {
                tracing::debug!(range = %range, gap = %plan.gap, "Dropping stale load");
                return LoadEvent::Stale { range };
            }
        };

        let received = items.len();
        if received != plan.count {
            tracing::warn!(
                range = %range,
                received,
                "Short response, marking the requested range as loaded"
            );
        }

        if let Err(e) = self.render(state, plan, placeholder, items) {
            tracing::error!(range = %range, error = %e, "Gap bookkeeping rejected a load");
            return LoadEvent::Failed {
                range,
                reason: e.to_string(),
            };
        }

        tracing::info!(range = %range, strategy = %plan.strategy, "Loaded items");
        LoadEvent::Loaded {
            range,
            strategy: plan.strategy,
            received,
        }
    }

    fn render(
        &self,
        state: &mut LoaderState<L>,
        plan: FillPlan,
        placeholder: NodeId,
        items: Vec<String>,
    ) -> PagelessResult<()> {
        match plan.strategy {
            FillStrategy::Head => {
                let shrunk = state.gaps.shrink_from_start(plan.gap, plan.count)?;
                state.layout.insert_before(placeholder, Content::Items(items));
                self.settle(state, plan.gap, placeholder, shrunk);
            }
            FillStrategy::Tail => {
                let shrunk = state.gaps.shrink_from_end(plan.gap, plan.count)?;
                state.layout.insert_after(placeholder, Content::Items(items));
                self.settle(state, plan.gap, placeholder, shrunk);
            }
            FillStrategy::Middle => {
                let rest = plan.expected.end.saturating_sub(plan.start + plan.count);
                let sibling = state
                    .layout
                    .create_placeholder(rest as f64 * self.config.item_size);
                let split = match state.gaps.split_at(plan.gap, plan.start, plan.count, sibling) {
                    Ok(split) => split,
                    Err(e) => {
                        state.layout.remove(sibling);
                        return Err(e);
                    }
                };

                // Both go directly after the original: sibling first, so the
                // items end up between the two placeholders.
                state.layout.insert_after(placeholder, Content::Node(sibling));
                state.layout.insert_after(placeholder, Content::Items(items));

                let shrunk = match split.removed {
                    Some(removed) => Shrunk::Removed(removed),
                    None => Shrunk::Resized,
                };
                self.settle(state, plan.gap, placeholder, shrunk);
            }
        }
        Ok(())
    }

    /// Resize a surviving placeholder or discard a removed one.
    fn settle(
        &self,
        state: &mut LoaderState<L>,
        gap: GapId,
        placeholder: NodeId,
        shrunk: Shrunk<NodeId>,
    ) {
        match shrunk {
            Shrunk::Removed(node) => state.layout.remove(node),
            Shrunk::Resized => {
                if let Some(gap) = state.gaps.get(gap) {
                    state
                        .layout
                        .set_height(placeholder, gap.placeholder_size(self.config.item_size));
                }
            }
        }
    }
}
