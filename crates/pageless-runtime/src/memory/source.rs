use crate::traits::Fetcher;
use async_trait::async_trait;
use pageless_core::{FetchRequest, PagelessResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TEMPLATE: &str = "<div class=\"item\">{index}</div>";

/// An in-memory dataset of `len` items, each rendered from a template.
///
/// `{index}` in the template is replaced by the item's index. Requests past
/// the end are truncated, so the tail returns fewer items than asked for.
#[derive(Debug, Clone)]
pub struct RangeSource {
    len: usize,
    template: String,
    latency: Duration,
    fetches: Arc<AtomicUsize>,
}

impl RangeSource {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            template: DEFAULT_TEMPLATE.to_string(),
            latency: Duration::ZERO,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Delay every fetch by `latency`, as a remote endpoint would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of fetches served so far, shared between clones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn render(&self, index: usize) -> String {
        self.template.replace("{index}", &index.to_string())
    }
}

#[async_trait]
impl Fetcher for RangeSource {
    async fn fetch(&self, request: FetchRequest) -> PagelessResult<Vec<String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(
            method = %request.method,
            start = request.start,
            count = request.count,
            "Serving range"
        );

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let end = request.start.saturating_add(request.count).min(self.len);
        Ok((request.start..end).map(|index| self.render(index)).collect())
    }
}
