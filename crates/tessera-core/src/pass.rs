//! Node-pass trait and its per-application side channels.
//!
//! A node pass is a stateful rewrite applied to one node at a time by the
//! scheduler in `tessera-compiler`. Besides mutating the graph, a pass talks
//! back to the scheduler through a [`PassEffects`] value: which nodes to
//! revisit (later, immediately, or in an ancestor graph), which nodes it
//! deleted, and which nodes to suspend or resume. The scheduler clears the
//! effects before every application and reads them right after it.

use crate::ir::{ComputeGraph, GraphId, Node, NodeId};
use crate::{Error, Result};
use std::collections::HashSet;

/// Ordered list of passes with the names used in logs and for filtering.
pub type NamesToPass = Vec<(String, Box<dyn NodePass>)>;

/// Which visit of a node the scheduler is performing.
///
/// Nodes that own subgraphs are visited twice around the recursion into
/// their subgraphs; every other node is visited once per dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitPhase {
    /// Plain node without subgraphs.
    Single,

    /// First visit of a subgraph owner, before its subgraphs are optimized.
    /// Passes push information down into the subgraphs here.
    BeforeSubgraphs,

    /// Second visit of a subgraph owner, after all of its subgraphs reached
    /// their fixed point. Passes pull results up out of the subgraphs here.
    AfterSubgraphs,
}

impl VisitPhase {
    /// Whether this visit happens after the node's subgraphs were optimized.
    pub fn optimize_after_subgraph(&self) -> bool {
        matches!(self, VisitPhase::AfterSubgraphs)
    }
}

/// Trait for implementing node passes.
///
/// # Example
///
/// ```ignore
/// struct CastEliminationPass;
///
/// impl NodePass for CastEliminationPass {
///     fn run(&mut self, ctx: &mut PassCtx<'_>) -> Result<()> {
///         if ctx.node()?.op_type() == "Cast" && is_noop_cast(ctx)? {
///             ctx.isolate_and_delete_node(ctx.node_id, &[Some(0)], false)?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait NodePass {
    /// Human-readable name, used when the pass is not registered by name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the pass on `ctx.node_id`.
    ///
    /// Any error is fatal for the whole scheduler run.
    fn run(&mut self, ctx: &mut PassCtx<'_>) -> Result<()>;

    /// Gate deciding whether `run` is called for a node at all.
    fn needs_processing(&self, _graph: &ComputeGraph, _node: NodeId) -> bool {
        true
    }

    /// Called once when a graph would be at its fixed point but `suspended`
    /// nodes remain. Resuming nodes through `effects` lets the sweep continue;
    /// resuming nothing ends the sweep with those nodes unprocessed.
    fn on_suspend_nodes_leaked(
        &mut self,
        _graph: &ComputeGraph,
        _graph_id: GraphId,
        _suspended: &[NodeId],
        _effects: &mut PassEffects,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after `graph_id` reached its fixed point. Nodes pushed to
    /// `repass` are revisited by the root traversal.
    fn on_finish_graph(
        &mut self,
        _graph: &ComputeGraph,
        _graph_id: GraphId,
        _repass: &mut Vec<NodeId>,
    ) -> Result<()> {
        Ok(())
    }
}

// ────────────────────────────── PassEffects ──────────────────────────────

/// Insertion-ordered set of node ids.
#[derive(Debug, Default, Clone)]
struct NodeList {
    order: Vec<NodeId>,
    set: HashSet<NodeId>,
}

impl NodeList {
    fn insert(&mut self, node: NodeId) {
        if self.set.insert(node) {
            self.order.push(node);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if self.set.remove(&node) {
            self.order.retain(|&n| n != node);
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.set.clear();
    }
}

/// Requests a pass makes to the scheduler during one application.
#[derive(Debug, Default, Clone)]
pub struct PassEffects {
    repass: NodeList,
    immediate_repass: NodeList,
    global_immediate_repass: NodeList,
    deleted: NodeList,
    suspend: NodeList,
    resume: NodeList,
}

impl PassEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revisit `node` after the current sweep of its graph.
    pub fn add_repass_node(&mut self, node: NodeId) {
        self.repass.insert(node);
    }

    /// Revisit `node` before anything else queued in its graph.
    pub fn add_immediate_repass_node(&mut self, node: NodeId) {
        self.immediate_repass.insert(node);
    }

    /// Revisit `node`, which lives in an ancestor graph, through the root traversal.
    pub fn add_global_immediate_repass_node(&mut self, node: NodeId) {
        self.global_immediate_repass.insert(node);
    }

    /// Report that `node` was removed from the graph.
    pub fn add_node_deleted(&mut self, node: NodeId) {
        self.deleted.insert(node);
    }

    /// Exclude `node` from scheduling until it is resumed.
    pub fn add_node_suspend(&mut self, node: NodeId) {
        self.resume.remove(node);
        self.suspend.insert(node);
    }

    /// Re-admit a suspended `node`.
    pub fn add_node_resume(&mut self, node: NodeId) {
        self.suspend.remove(node);
        self.resume.insert(node);
    }

    pub fn nodes_need_repass(&self) -> &[NodeId] {
        &self.repass.order
    }

    pub fn nodes_need_immediate_repass(&self) -> &[NodeId] {
        &self.immediate_repass.order
    }

    pub fn nodes_need_global_immediate_repass(&self) -> &[NodeId] {
        &self.global_immediate_repass.order
    }

    pub fn nodes_deleted(&self) -> &[NodeId] {
        &self.deleted.order
    }

    pub fn nodes_suspend(&self) -> &[NodeId] {
        &self.suspend.order
    }

    pub fn nodes_resume(&self) -> &[NodeId] {
        &self.resume.order
    }

    /// Reset every side channel.
    pub fn clear(&mut self) {
        self.repass.clear();
        self.immediate_repass.clear();
        self.global_immediate_repass.clear();
        self.deleted.clear();
        self.suspend.clear();
        self.resume.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.repass.order.is_empty()
            && self.immediate_repass.order.is_empty()
            && self.global_immediate_repass.order.is_empty()
            && self.deleted.order.is_empty()
            && self.suspend.order.is_empty()
            && self.resume.order.is_empty()
    }
}

// ──────────────────────────────── PassCtx ────────────────────────────────

/// Context passed to `NodePass::run()`.
///
/// Gives the pass the mutable graph, the node under visit and the visit
/// phase, and records its requests to the scheduler.
pub struct PassCtx<'a> {
    /// The full graph (all nesting levels).
    pub graph: &'a mut ComputeGraph,

    /// The node being visited.
    pub node_id: NodeId,

    /// The graph directly containing the node.
    pub graph_id: GraphId,

    /// Which visit of the node this is.
    pub phase: VisitPhase,

    effects: &'a mut PassEffects,
}

impl<'a> PassCtx<'a> {
    /// Create a new pass context.
    pub fn new(
        graph: &'a mut ComputeGraph,
        node_id: NodeId,
        graph_id: GraphId,
        phase: VisitPhase,
        effects: &'a mut PassEffects,
    ) -> Self {
        Self {
            graph,
            node_id,
            graph_id,
            phase,
            effects,
        }
    }

    /// The node being visited.
    pub fn node(&self) -> Result<&Node> {
        self.graph.node(self.node_id)
    }

    pub fn optimize_after_subgraph(&self) -> bool {
        self.phase.optimize_after_subgraph()
    }

    /// Requests recorded so far.
    pub fn effects(&self) -> &PassEffects {
        self.effects
    }

    pub fn add_repass_node(&mut self, node: NodeId) {
        self.effects.add_repass_node(node);
    }

    pub fn add_immediate_repass_node(&mut self, node: NodeId) {
        self.effects.add_immediate_repass_node(node);
    }

    pub fn add_global_immediate_repass_node(&mut self, node: NodeId) {
        self.effects.add_global_immediate_repass_node(node);
    }

    /// Revisit `node` and its direct predecessors and successors after the sweep.
    pub fn add_repass_nodes_with_in_out(&mut self, node: NodeId) {
        self.effects.add_repass_node(node);
        self.repass_neighbors(node, false);
    }

    /// Revisit `node` and its direct predecessors and successors immediately.
    pub fn add_immediate_repass_nodes_with_in_out(&mut self, node: NodeId) {
        self.effects.add_immediate_repass_node(node);
        self.repass_neighbors(node, true);
    }

    pub fn add_node_deleted(&mut self, node: NodeId) {
        self.effects.add_node_deleted(node);
    }

    pub fn add_node_suspend(&mut self, node: NodeId) {
        self.effects.add_node_suspend(node);
    }

    pub fn add_node_resume(&mut self, node: NodeId) {
        self.effects.add_node_resume(node);
    }

    /// Splice `node` out of the graph and remove it.
    ///
    /// Consumers of output `i` are reconnected to the producer of input
    /// `io_map[i]` (`None` drops them), see [`ComputeGraph::isolate_node`].
    /// The node's former neighbors are queued for another visit, immediately
    /// when `immediate` is set, and the deletion is reported to the scheduler.
    ///
    /// # Errors
    ///
    /// Fails without touching the graph if `io_map` does not match the
    /// node's output count.
    pub fn isolate_and_delete_node(
        &mut self,
        node: NodeId,
        io_map: &[Option<usize>],
        immediate: bool,
    ) -> Result<()> {
        let target = self.graph.node(node)?;
        if io_map.len() != target.output_count() {
            return Err(Error::IoMapMismatch {
                node: target.name.clone(),
                expected: target.output_count(),
                actual: io_map.len(),
            });
        }

        self.repass_neighbors(node, immediate);
        self.graph.isolate_node(node, io_map)?;
        self.graph.remove_node(node)?;
        self.effects.add_node_deleted(node);
        Ok(())
    }

    fn repass_neighbors(&mut self, node: NodeId, immediate: bool) {
        let neighbors = self
            .graph
            .in_nodes(node)
            .into_iter()
            .chain(self.graph.out_nodes(node));
        for neighbor in neighbors {
            if immediate {
                self.effects.add_immediate_repass_node(neighbor);
            } else {
                self.effects.add_repass_node(neighbor);
            }
        }
    }
}
