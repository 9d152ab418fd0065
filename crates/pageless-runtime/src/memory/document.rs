//! Headless layout surface.
//!
//! Models a scroll container as a flat, ordered list of nodes. Placeholders
//! carry an explicit height; item nodes all share one fixed item height.
//! Handles are cheap clones of one shared tree, the way DOM handles are.

use crate::traits::{Content, Layout, ScrollEvent};
use pageless_core::NodeId;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "markup", rename_all = "snake_case")]
pub enum NodeKind {
    Placeholder,
    Item(String),
}

#[derive(Debug, Clone)]
struct Node {
    id: NodeId,
    kind: NodeKind,
    height: f64,
}

/// One attached node as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub height: f64,
    pub offset_top: f64,
}

#[derive(Debug)]
struct Tree {
    attached: Vec<Node>,
    detached: HashMap<NodeId, Node>,
    next_id: u64,
    item_height: f64,
    viewport_height: f64,
    scroll_top: f64,
}

impl Tree {
    fn allocate(&mut self, kind: NodeKind, height: f64) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node { id, kind, height }
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.attached.iter().position(|n| n.id == node)
    }

    fn find(&self, node: NodeId) -> Option<&Node> {
        self.attached
            .iter()
            .find(|n| n.id == node)
            .or_else(|| self.detached.get(&node))
    }

    fn content_height(&self) -> f64 {
        self.attached.iter().map(|n| n.height).sum()
    }

    fn materialize(&mut self, content: Content) -> Vec<Node> {
        match content {
            Content::Items(items) => items
                .into_iter()
                .map(|markup| {
                    let height = self.item_height;
                    self.allocate(NodeKind::Item(markup), height)
                })
                .collect(),
            Content::Node(id) => match self.detached.remove(&id) {
                Some(node) => vec![node],
                None => {
                    tracing::warn!(node = %id, "Inserting a node that is not detached");
                    Vec::new()
                }
            },
        }
    }

    fn insert_at(&mut self, anchor: NodeId, content: Content, after: bool) {
        let Some(position) = self.position(anchor) else {
            tracing::warn!(anchor = %anchor, "Insert anchor is not attached");
            return;
        };
        let index = if after { position + 1 } else { position };
        let nodes = self.materialize(content);
        self.attached.splice(index..index, nodes);
    }
}

/// Cloneable handle to an in-memory scroll container.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    tree: Arc<Mutex<Tree>>,
    scrolls: broadcast::Sender<ScrollEvent>,
}

impl MemoryDocument {
    /// An empty container showing `viewport_height` pixels, rendering every
    /// item `item_height` pixels tall.
    pub fn new(viewport_height: f64, item_height: f64) -> Self {
        let (scrolls, _) = broadcast::channel(16);
        Self {
            tree: Arc::new(Mutex::new(Tree {
                attached: Vec::new(),
                detached: HashMap::new(),
                next_id: 1,
                item_height,
                viewport_height,
                scroll_top: 0.0,
            })),
            scrolls,
        }
    }

    /// Scroll to `scroll_top`, clamped to the scrollable range, and notify
    /// observers.
    pub fn scroll_to(&self, scroll_top: f64) -> f64 {
        let clamped = {
            let mut tree = self.tree.lock();
            let max = (tree.content_height() - tree.viewport_height).max(0.0);
            tree.scroll_top = scroll_top.clamp(0.0, max);
            tree.scroll_top
        };
        let _ = self.scrolls.send(ScrollEvent {
            scroll_top: clamped,
        });
        clamped
    }

    pub fn content_height(&self) -> f64 {
        self.tree.lock().content_height()
    }

    /// Attached nodes in document order.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        let tree = self.tree.lock();
        let mut offset_top = 0.0;
        tree.attached
            .iter()
            .map(|node| {
                let snapshot = NodeSnapshot {
                    id: node.id,
                    kind: node.kind.clone(),
                    height: node.height,
                    offset_top,
                };
                offset_top += node.height;
                snapshot
            })
            .collect()
    }

    /// Markup of the rendered items in document order.
    pub fn items(&self) -> Vec<String> {
        self.tree
            .lock()
            .attached
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Item(markup) => Some(markup.clone()),
                NodeKind::Placeholder => None,
            })
            .collect()
    }

    pub fn placeholder_count(&self) -> usize {
        self.tree
            .lock()
            .attached
            .iter()
            .filter(|node| node.kind == NodeKind::Placeholder)
            .count()
    }

    /// Nodes created but not attached yet.
    pub fn detached_count(&self) -> usize {
        self.tree.lock().detached.len()
    }
}

impl Layout for MemoryDocument {
    fn scroll_top(&self) -> f64 {
        self.tree.lock().scroll_top
    }

    fn viewport_height(&self) -> f64 {
        self.tree.lock().viewport_height
    }

    fn create_placeholder(&mut self, height: f64) -> NodeId {
        let mut tree = self.tree.lock();
        let node = tree.allocate(NodeKind::Placeholder, height);
        let id = node.id;
        tree.detached.insert(id, node);
        id
    }

    fn append(&mut self, node: NodeId) {
        let mut tree = self.tree.lock();
        match tree.detached.remove(&node) {
            Some(node) => tree.attached.push(node),
            None => tracing::warn!(node = %node, "Appending a node that is not detached"),
        }
    }

    fn measure_height(&self, node: NodeId) -> f64 {
        self.tree.lock().find(node).map_or(0.0, |n| n.height)
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        let tree = self.tree.lock();
        match tree.position(node) {
            Some(position) => tree.attached[..position].iter().map(|n| n.height).sum(),
            None => 0.0,
        }
    }

    fn insert_before(&mut self, anchor: NodeId, content: Content) {
        self.tree.lock().insert_at(anchor, content, false);
    }

    fn insert_after(&mut self, anchor: NodeId, content: Content) {
        self.tree.lock().insert_at(anchor, content, true);
    }

    fn remove(&mut self, node: NodeId) {
        let mut tree = self.tree.lock();
        if let Some(position) = tree.position(node) {
            tree.attached.remove(position);
        } else {
            tree.detached.remove(&node);
        }
    }

    fn set_height(&mut self, node: NodeId, height: f64) {
        let mut tree = self.tree.lock();
        if let Some(position) = tree.position(node) {
            tree.attached[position].height = height;
        } else if let Some(detached) = tree.detached.get_mut(&node) {
            detached.height = height;
        }
    }

    fn subscribe_scroll(&self) -> broadcast::Receiver<ScrollEvent> {
        self.scrolls.subscribe()
    }
}
