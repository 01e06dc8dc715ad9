//! Fixed-point node-pass scheduler.
//!
//! `GePass` applies an ordered list of node passes to every node of a nested
//! compute graph until no pass asks for more work:
//!
//! 1. Each graph's queue is seeded with its nodes in stable order.
//! 2. Every dequeued node runs through all passes in order. After each pass
//!    the scheduler reads the pass's side channels: deletions, suspensions,
//!    resumptions, immediate (jump-queue) and batched repass requests.
//! 3. Nodes owning subgraphs are visited twice: once before and once after
//!    their subgraphs are driven to their own fixed point.
//! 4. A drained queue is refilled from the batched repass worklist; leaked
//!    suspensions get one chance to be resumed; then `on_finish_graph` runs.
//!
//! Requests that cross graph boundaries land in the root-level worklist,
//! which only the root scheduler drains.

use crate::config::EngineConfig;
use crate::state::{GraphLevelState, RepassLevelState, RootGraphLevelState};
use tessera_core::{
    ComputeGraph, Error, GraphId, NamesToPass, NodeId, PassCtx, PassEffects, PassRegistry, Result,
    VisitPhase,
};
use tracing::{debug, debug_span, error, trace, warn};

/// Root scheduler for one nested compute graph.
///
/// Owns the root-level repass state for the whole traversal; the per-graph
/// schedulers it spawns borrow it.
///
/// # Example
///
/// ```
/// use tessera_compiler::{GePass, IdentityEliminationPass};
/// use tessera_core::{GraphBuilder, NamesToPass};
///
/// # fn main() -> tessera_core::Result<()> {
/// let mut builder = GraphBuilder::new("main");
/// builder.node("x", "Data", 0, 1)?;
/// builder.node("id", "Identity", 1, 1)?;
/// builder.node("out", "NetOutput", 1, 0)?;
/// builder.data_edge("x", 0, "id", 0)?.data_edge("id", 0, "out", 0)?;
/// let mut graph = builder.build();
///
/// let mut passes: NamesToPass = Vec::new();
/// passes.push((
///     "identity_elimination".to_string(),
///     Box::new(IdentityEliminationPass::new()),
/// ));
/// GePass::new(&mut graph).run(&mut passes, false)?;
///
/// assert_eq!(graph.node_count(), 2);
/// # Ok(())
/// # }
/// ```
pub struct GePass<'g> {
    graph: &'g mut ComputeGraph,
    config: EngineConfig,
    registry: Option<&'g PassRegistry>,
    root_state: RootGraphLevelState,
    after_graph_optimized: NamesToPass,
}

impl<'g> GePass<'g> {
    /// Create a scheduler with the default configuration.
    pub fn new(graph: &'g mut ComputeGraph) -> Self {
        Self {
            graph,
            config: EngineConfig::default(),
            registry: None,
            root_state: RootGraphLevelState::default(),
            after_graph_optimized: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry consulted by the pass filter for optimization levels.
    pub fn with_registry(mut self, registry: &'g PassRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Schedule `passes` for one more traversal, strictly after the primary
    /// pass list reached its fixed point over the entire nested graph.
    pub fn add_pass_after_graph_optimized(&mut self, passes: NamesToPass) -> &mut Self {
        self.after_graph_optimized.extend(passes);
        self
    }

    /// Run `passes` over the graph to a fixed point.
    ///
    /// With `with_filter`, passes disabled by the configuration are skipped.
    ///
    /// # Errors
    ///
    /// The first failing pass aborts the run with `Error::PassFailed`; the
    /// graph is left as the passes before it modified it. Runs that exceed the
    /// configured sweep or nesting limits fail as well.
    #[tracing::instrument(skip_all, fields(graph = self.graph.graph_name(GraphId::ROOT), num_passes = passes.len(), with_filter = with_filter))]
    pub fn run(&mut self, passes: &mut NamesToPass, with_filter: bool) -> Result<()> {
        let enabled = self.enabled_passes(passes, with_filter);
        self.run_traversal(passes, &enabled)?;

        if !self.after_graph_optimized.is_empty() {
            let mut after = std::mem::take(&mut self.after_graph_optimized);
            let enabled = self.enabled_passes(&after, with_filter);
            debug!(num_passes = enabled.len(), "running passes after graph optimized");
            let result = self.run_traversal(&mut after, &enabled);
            self.after_graph_optimized = after;
            result?;
        }

        Ok(())
    }

    fn enabled_passes(&self, passes: &NamesToPass, with_filter: bool) -> Vec<usize> {
        passes
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| {
                if !with_filter {
                    return true;
                }
                let level = self.registry.and_then(|r| r.level(name));
                let enabled = self.config.is_pass_enabled(name, level);
                if !enabled {
                    debug!(pass = %name, "pass disabled by configuration");
                }
                enabled
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn run_traversal(&mut self, passes: &mut NamesToPass, enabled: &[usize]) -> Result<()> {
        self.root_state = RootGraphLevelState::default();
        let mut scheduler = GraphScheduler {
            graph: &mut *self.graph,
            passes,
            enabled,
            config: &self.config,
            root_state: &mut self.root_state,
            graph_id: GraphId::ROOT,
            depth: 0,
            effects: PassEffects::new(),
        };
        scheduler.run()
    }
}

/// Scheduler for one graph of the nesting.
struct GraphScheduler<'a> {
    graph: &'a mut ComputeGraph,
    passes: &'a mut NamesToPass,
    /// Indices into `passes` that survived the filter.
    enabled: &'a [usize],
    config: &'a EngineConfig,
    root_state: &'a mut RootGraphLevelState,
    graph_id: GraphId,
    depth: usize,
    effects: PassEffects,
}

impl GraphScheduler<'_> {
    fn is_root(&self) -> bool {
        self.depth == 0
    }

    fn owns(&self, node: NodeId) -> bool {
        self.graph
            .node(node)
            .is_ok_and(|n| n.owner() == self.graph_id)
    }

    /// Whether `node` still names the node that had `serial`.
    fn is_same_node(&self, node: NodeId, serial: u64) -> bool {
        self.graph.node(node).is_ok_and(|n| n.serial() == serial)
    }

    /// Clear the deleted mark of an id that a pass handed to a new node.
    fn reclaim_if_reused(&self, node: NodeId, g_state: &mut GraphLevelState) {
        if let Some(watermark) = g_state.deleted_watermark(node) {
            if self.graph.node(node).is_ok_and(|n| n.serial() >= watermark) {
                trace!(node = self.graph.node_name(node), "deleted id reused by a new node");
                g_state.reclaim(node);
            }
        }
    }

    /// Drive this graph to its fixed point.
    fn run(&mut self) -> Result<()> {
        let graph_name = self.graph.graph_name(self.graph_id).to_string();
        let _span = debug_span!("graph", name = %graph_name, depth = self.depth).entered();

        let mut g_state = GraphLevelState::new();
        g_state.seed(self.graph.graph_nodes(self.graph_id)?);
        let mut rp_state = RepassLevelState::default();
        let mut sweeps = 0usize;

        loop {
            sweeps += 1;
            if let Some(limit) = self.config.max_sweeps {
                if sweeps > limit {
                    error!(graph = %graph_name, limit, "graph did not reach a fixed point");
                    return Err(Error::SweepLimitExceeded {
                        graph: graph_name,
                        limit,
                    });
                }
            }

            trace!(sweep = sweeps, queued = g_state.queue_len(), "starting sweep");
            self.drain(&mut g_state, &mut rp_state)?;

            if !rp_state.is_empty() {
                trace!(count = rp_state.len(), "requeueing repass nodes");
                g_state.requeue(rp_state.take());
                continue;
            }

            if !g_state.suspended_nodes().is_empty() {
                if self.handle_leaked_suspends(&mut g_state, &mut rp_state)? {
                    continue;
                }
                warn!(
                    graph = %graph_name,
                    count = g_state.suspended_nodes().len(),
                    "suspended nodes were never resumed, leaving them unprocessed"
                );
            }

            if self.finish_graph(&mut g_state)? {
                continue;
            }
            break;
        }

        debug!(sweeps, "graph reached fixed point");
        Ok(())
    }

    fn drain(
        &mut self,
        g_state: &mut GraphLevelState,
        rp_state: &mut RepassLevelState,
    ) -> Result<()> {
        while let Some(node) = g_state.pop_ready() {
            if !self.graph.contains_node(node) {
                // Removed without being reported.
                g_state.mark_deleted(node, self.graph.next_serial());
                rp_state.erase_node_from_repass(node);
                continue;
            }

            self.visit_node(node, g_state, rp_state)?;

            if self.is_root() {
                self.absorb_root_repass(g_state);
            }
        }
        Ok(())
    }

    fn visit_node(
        &mut self,
        node: NodeId,
        g_state: &mut GraphLevelState,
        rp_state: &mut RepassLevelState,
    ) -> Result<()> {
        let current = self.graph.node(node)?;
        let serial = current.serial();
        let subgraphs = current.subgraphs().to_vec();
        if subgraphs.is_empty() {
            return self.run_passes_on_node(node, serial, VisitPhase::Single, g_state, rp_state);
        }

        self.run_passes_on_node(node, serial, VisitPhase::BeforeSubgraphs, g_state, rp_state)?;
        for subgraph in subgraphs {
            if self.skip_rest_of_visit(node, serial, g_state) {
                return Ok(());
            }
            self.run_subgraph(subgraph)?;
        }
        if self.skip_rest_of_visit(node, serial, g_state) {
            return Ok(());
        }

        self.run_passes_on_node(node, serial, VisitPhase::AfterSubgraphs, g_state, rp_state)
    }

    fn skip_rest_of_visit(&self, node: NodeId, serial: u64, g_state: &GraphLevelState) -> bool {
        if g_state.is_deleted(node) || !self.is_same_node(node, serial) {
            trace!(node = ?node, "subgraph owner deleted, ending its visit");
            return true;
        }
        if g_state.is_suspended(node) {
            trace!(node = self.graph.node_name(node), "subgraph owner suspended, ending its visit");
            return true;
        }
        false
    }

    fn run_subgraph(&mut self, subgraph: GraphId) -> Result<()> {
        let depth = self.depth + 1;
        if depth > self.config.max_subgraph_depth {
            error!(
                graph = self.graph.graph_name(subgraph),
                limit = self.config.max_subgraph_depth,
                "subgraph nesting too deep"
            );
            return Err(Error::DepthLimitExceeded(self.config.max_subgraph_depth));
        }

        let mut child = GraphScheduler {
            graph: &mut *self.graph,
            passes: &mut *self.passes,
            enabled: self.enabled,
            config: self.config,
            root_state: &mut *self.root_state,
            graph_id: subgraph,
            depth,
            effects: PassEffects::new(),
        };
        child.run()
    }

    /// Run every enabled pass on `node`.
    ///
    /// The visit ends early once a pass deletes, replaces or suspends it.
    fn run_passes_on_node(
        &mut self,
        node: NodeId,
        serial: u64,
        phase: VisitPhase,
        g_state: &mut GraphLevelState,
        rp_state: &mut RepassLevelState,
    ) -> Result<()> {
        for &index in self.enabled {
            let (name, pass) = &mut self.passes[index];
            if !pass.needs_processing(self.graph, node) {
                continue;
            }

            self.effects.clear();
            let watermark = self.graph.next_serial();
            let mut ctx = PassCtx::new(self.graph, node, self.graph_id, phase, &mut self.effects);
            if let Err(err) = pass.run(&mut ctx) {
                return Err(pass_failed(name, self.graph.node_name(node), err));
            }
            trace!(pass = %name, node = self.graph.node_name(node), ?phase, "pass applied");

            if self.effects.nodes_deleted().contains(&node) {
                debug!(pass = %name, node = ?node, "node deleted, skipping remaining passes");
            }
            self.apply_effects(g_state, rp_state, watermark);

            if g_state.is_deleted(node) || !self.is_same_node(node, serial) {
                break;
            }
            if g_state.is_suspended(node) {
                debug!(node = self.graph.node_name(node), "node suspended, skipping remaining passes");
                break;
            }
        }
        Ok(())
    }

    /// Route the requests a pass recorded, then reset them.
    ///
    /// `watermark` is the graph's next serial from before the pass ran.
    fn apply_effects(
        &mut self,
        g_state: &mut GraphLevelState,
        rp_state: &mut RepassLevelState,
        watermark: u64,
    ) {
        let mut effects = std::mem::take(&mut self.effects);

        for &node in effects.nodes_deleted() {
            g_state.mark_deleted(node, watermark);
            rp_state.erase_node_from_repass(node);
            self.root_state.erase_node_from_repass(node);
        }

        for &node in effects.nodes_need_repass() {
            self.reclaim_if_reused(node, g_state);
            if g_state.is_deleted(node) || !self.graph.contains_node(node) {
                continue;
            }
            if !self.owns(node) {
                self.root_state.add_node_to_repass(node);
            } else if !g_state.is_pending(node) {
                rp_state.add_node_to_repass(node);
            }
        }

        // Reverse so the first request ends up at the front.
        for &node in effects.nodes_need_immediate_repass().iter().rev() {
            self.reclaim_if_reused(node, g_state);
            if g_state.is_deleted(node) || !self.graph.contains_node(node) {
                continue;
            }
            if self.owns(node) {
                g_state.push_front(node);
            } else {
                self.root_state.add_node_to_repass(node);
            }
        }

        for &node in effects.nodes_need_global_immediate_repass() {
            if self.graph.contains_node(node) {
                self.root_state.add_node_to_repass(node);
            }
        }

        for &node in effects.nodes_suspend() {
            self.reclaim_if_reused(node, g_state);
            if self.owns(node) {
                g_state.suspend(node);
            } else {
                warn!(node = ?node, "ignoring suspension of a node outside the current graph");
            }
        }

        for &node in effects.nodes_resume() {
            if g_state.resume(node) {
                trace!(node = self.graph.node_name(node), "node resumed");
            }
        }

        effects.clear();
        self.effects = effects;
    }

    /// Give every pass a chance to resume leaked suspended nodes.
    ///
    /// Returns `true` if there is new work for another sweep.
    fn handle_leaked_suspends(
        &mut self,
        g_state: &mut GraphLevelState,
        rp_state: &mut RepassLevelState,
    ) -> Result<bool> {
        debug!(
            count = g_state.suspended_nodes().len(),
            "suspended nodes leaked at fixed point"
        );

        for &index in self.enabled {
            // Earlier passes may have resumed some of them.
            let suspended = g_state.suspended_nodes().to_vec();
            if suspended.is_empty() {
                break;
            }

            let (name, pass) = &mut self.passes[index];
            self.effects.clear();
            let watermark = self.graph.next_serial();
            if let Err(err) =
                pass.on_suspend_nodes_leaked(self.graph, self.graph_id, &suspended, &mut self.effects)
            {
                return Err(pass_failed(name, self.graph.graph_name(self.graph_id), err));
            }
            self.apply_effects(g_state, rp_state, watermark);
        }

        Ok(!g_state.is_queue_empty() || !rp_state.is_empty())
    }

    /// Run `on_finish_graph` hooks and, at the root, pull in root-level work.
    ///
    /// Returns `true` if there is new work for another sweep.
    fn finish_graph(&mut self, g_state: &mut GraphLevelState) -> Result<bool> {
        let mut repass = Vec::new();
        for &index in self.enabled {
            let (name, pass) = &mut self.passes[index];
            if let Err(err) = pass.on_finish_graph(self.graph, self.graph_id, &mut repass) {
                return Err(pass_failed(name, self.graph.graph_name(self.graph_id), err));
            }
        }
        for node in repass {
            self.root_state.add_node_to_repass(node);
        }

        if !self.is_root() {
            return Ok(false);
        }
        Ok(self.absorb_root_repass(g_state))
    }

    /// Move root-level requests to the front of the root queue.
    ///
    /// A request naming a nested node revisits its top-level ancestor, which
    /// re-runs the enclosing subgraphs to their fixed point.
    fn absorb_root_repass(&mut self, g_state: &mut GraphLevelState) -> bool {
        if self.root_state.is_empty() {
            return false;
        }

        let mut absorbed = false;
        for node in self.root_state.take().into_iter().rev() {
            let Some(target) = self.graph.ancestor_in(node, self.graph_id) else {
                trace!(node = ?node, "dropping root-level repass of a removed node");
                continue;
            };
            self.reclaim_if_reused(target, g_state);
            if g_state.is_deleted(target) {
                trace!(node = ?target, "dropping root-level repass of a deleted node");
                continue;
            }
            g_state.push_front(target);
            absorbed = true;
        }
        absorbed
    }
}

fn pass_failed(pass: &str, target: &str, err: Error) -> Error {
    error!(pass, target, error = %err, "node pass failed");
    Error::PassFailed {
        pass: pass.to_string(),
        node: target.to_string(),
        source: Box::new(err),
    }
}
