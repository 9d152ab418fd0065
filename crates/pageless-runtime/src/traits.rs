use async_trait::async_trait;
use pageless_core::{FetchRequest, NodeId, PagelessResult};

/// Source of rendered items for an index range.
/// Implementations own the transport (HTTP, IPC, an in-memory table, ...).
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the items for `[request.start, request.start + request.count)`.
    ///
    /// May return fewer than `count` items at the dataset's tail.
    async fn fetch(&self, request: FetchRequest) -> PagelessResult<Vec<String>>;
}

/// Something to insert next to an anchor node.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Freshly fetched, rendered items in index order.
    Items(Vec<String>),
    /// An existing detached node, e.g. a new placeholder.
    Node(NodeId),
}

/// Emitted by a layout surface whenever its scroll position changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub scroll_top: f64,
}

/// The scrollable container the loader renders into.
///
/// All geometry is in container pixels. Nodes are addressed by [`NodeId`]s
/// that the surface hands out.
pub trait Layout: Send {
    fn scroll_top(&self) -> f64;

    fn viewport_height(&self) -> f64;

    /// Create a detached placeholder of the given height.
    fn create_placeholder(&mut self, height: f64) -> NodeId;

    /// Attach a detached node at the end of the container.
    fn append(&mut self, node: NodeId);

    fn measure_height(&self, node: NodeId) -> f64;

    /// Distance from the top of the container to the top of `node`.
    fn offset_top(&self, node: NodeId) -> f64;

    fn insert_before(&mut self, anchor: NodeId, content: Content);

    fn insert_after(&mut self, anchor: NodeId, content: Content);

    fn remove(&mut self, node: NodeId);

    fn set_height(&mut self, node: NodeId, height: f64);

    /// Subscribe to scroll notifications for this container.
    fn subscribe_scroll(&self) -> tokio::sync::broadcast::Receiver<ScrollEvent>;
}
