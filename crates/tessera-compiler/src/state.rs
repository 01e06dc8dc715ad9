//! Bookkeeping for the fixed-point traversal.
//!
//! - [`GraphLevelState`]: one sweep over one graph (queue, seen/passed/
//!   deleted/suspended sets).
//! - [`RepassLevelState`]: nodes queued for another sweep of the same graph.
//! - [`RootGraphLevelState`]: cross-graph requests, owned by the root
//!   scheduler and borrowed by every subgraph scheduler.

use std::collections::{HashMap, HashSet, VecDeque};
use tessera_core::NodeId;

/// Per-graph traversal state.
///
/// A node is *pending* when it was enqueued in the current drain and has not
/// been dequeued yet.
#[derive(Debug, Default)]
pub struct GraphLevelState {
    /// Deleted ids, each with the graph's next serial at deletion time.
    nodes_deleted: HashMap<NodeId, u64>,
    nodes_seen: HashSet<NodeId>,
    nodes_passed: HashSet<NodeId>,
    /// Suspended nodes, in suspension order.
    nodes_suspend: Vec<NodeId>,
    queue: VecDeque<NodeId>,
}

impl GraphLevelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue the graph's nodes in their stable order.
    pub fn seed(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            self.push_back(node);
        }
    }

    /// Enqueue `node` at the back unless it was already enqueued this drain.
    pub fn push_back(&mut self, node: NodeId) {
        if self.nodes_seen.insert(node) {
            self.queue.push_back(node);
        }
    }

    /// Move `node` to the front of the queue, re-admitting it if it was
    /// already dequeued.
    pub fn push_front(&mut self, node: NodeId) {
        if self.is_pending(node) {
            self.queue.retain(|&n| n != node);
        }
        self.nodes_seen.insert(node);
        self.nodes_passed.remove(&node);
        self.queue.push_front(node);
    }

    /// Dequeue the next node eligible for processing.
    ///
    /// Deleted nodes are dropped. Suspended nodes are dropped and forgotten
    /// by `nodes_seen`, so resuming them enqueues them again. The returned
    /// node is marked as passed.
    pub fn pop_ready(&mut self) -> Option<NodeId> {
        while let Some(node) = self.queue.pop_front() {
            if self.nodes_deleted.contains_key(&node) {
                continue;
            }
            if self.is_suspended(node) {
                self.nodes_seen.remove(&node);
                continue;
            }
            self.nodes_passed.insert(node);
            return Some(node);
        }
        None
    }

    /// Move the batched repass worklist into the queue for the next drain.
    pub fn requeue(&mut self, nodes: Vec<NodeId>) {
        for node in nodes {
            if self.nodes_deleted.contains_key(&node) {
                continue;
            }
            if !self.is_pending(node) {
                self.nodes_seen.remove(&node);
                self.nodes_passed.remove(&node);
            }
            self.push_back(node);
        }
    }

    pub fn is_pending(&self, node: NodeId) -> bool {
        self.nodes_seen.contains(&node) && !self.nodes_passed.contains(&node)
    }

    /// Record a deletion. `watermark` is the graph's next serial taken
    /// before the deleting pass ran.
    pub fn mark_deleted(&mut self, node: NodeId, watermark: u64) {
        self.nodes_deleted.insert(node, watermark);
        self.nodes_suspend.retain(|&n| n != node);
    }

    pub fn is_deleted(&self, node: NodeId) -> bool {
        self.nodes_deleted.contains_key(&node)
    }

    /// Watermark recorded when `node` was deleted.
    pub fn deleted_watermark(&self, node: NodeId) -> Option<u64> {
        self.nodes_deleted.get(&node).copied()
    }

    /// Forget everything known about a deleted id that now names a new node.
    pub fn reclaim(&mut self, node: NodeId) {
        if self.nodes_deleted.remove(&node).is_none() {
            return;
        }
        self.queue.retain(|&n| n != node);
        self.nodes_seen.remove(&node);
        self.nodes_passed.remove(&node);
    }

    pub fn suspend(&mut self, node: NodeId) {
        if !self.nodes_deleted.contains_key(&node) && !self.is_suspended(node) {
            self.nodes_suspend.push(node);
        }
    }

    /// Lift a suspension. Returns `true` if the node was enqueued again.
    pub fn resume(&mut self, node: NodeId) -> bool {
        if !self.is_suspended(node) {
            return false;
        }
        self.nodes_suspend.retain(|&n| n != node);
        if self.nodes_deleted.contains_key(&node) || self.is_pending(node) {
            return false;
        }
        self.nodes_seen.remove(&node);
        self.nodes_passed.remove(&node);
        self.push_back(node);
        true
    }

    pub fn is_suspended(&self, node: NodeId) -> bool {
        self.nodes_suspend.contains(&node)
    }

    pub fn suspended_nodes(&self) -> &[NodeId] {
        &self.nodes_suspend
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// Deduplicated, ordered worklist of nodes to revisit in the next sweep.
#[derive(Debug, Default)]
pub struct RepassLevelState {
    nodes_re_pass: Vec<NodeId>,
    nodes_re_pass_set: HashSet<NodeId>,
}

impl RepassLevelState {
    /// Queue `node`. Returns `false` if it was already queued.
    pub fn add_node_to_repass(&mut self, node: NodeId) -> bool {
        if !self.nodes_re_pass_set.insert(node) {
            return false;
        }
        self.nodes_re_pass.push(node);
        true
    }

    pub fn erase_node_from_repass(&mut self, node: NodeId) {
        if self.nodes_re_pass_set.remove(&node) {
            self.nodes_re_pass.retain(|&n| n != node);
        }
    }

    /// Drain the worklist, preserving insertion order.
    pub fn take(&mut self) -> Vec<NodeId> {
        self.nodes_re_pass_set.clear();
        std::mem::take(&mut self.nodes_re_pass)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes_re_pass
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_re_pass.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes_re_pass.len()
    }
}

/// Cross-graph repass requests for one whole nested traversal.
#[derive(Debug, Default)]
pub struct RootGraphLevelState {
    repass: RepassLevelState,
}

impl RootGraphLevelState {
    pub fn add_node_to_repass(&mut self, node: NodeId) -> bool {
        self.repass.add_node_to_repass(node)
    }

    pub fn erase_node_from_repass(&mut self, node: NodeId) {
        self.repass.erase_node_from_repass(node);
    }

    pub fn take(&mut self) -> Vec<NodeId> {
        self.repass.take()
    }

    pub fn is_empty(&self) -> bool {
        self.repass.is_empty()
    }
}
