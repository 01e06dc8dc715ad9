//! Dead node elimination pass.

use tessera_core::{ComputeGraph, NodeId, NodePass, PassCtx, Result};
use tracing::trace;

/// Operator type marking a graph's outputs.
const NET_OUTPUT: &str = "NetOutput";

/// Pass that removes nodes whose results nobody reads.
///
/// A node is dead when none of its outputs is consumed and it has no control
/// successors. Graph outputs and nodes owning subgraphs are never removed.
/// Producers of a removed node jump the queue, so a dead chain collapses
/// within a single drain.
pub struct DeadNodeEliminationPass {
    removed: usize,
}

impl DeadNodeEliminationPass {
    pub fn new() -> Self {
        Self { removed: 0 }
    }

    /// Number of nodes removed so far.
    pub fn removed(&self) -> usize {
        self.removed
    }

    fn is_dead(graph: &ComputeGraph, node: NodeId) -> bool {
        let Ok(n) = graph.node(node) else {
            return false;
        };
        n.op_type() != NET_OUTPUT
            && !n.has_subgraphs()
            && n.output_count() > 0
            && graph.out_nodes(node).is_empty()
    }
}

impl Default for DeadNodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePass for DeadNodeEliminationPass {
    fn name(&self) -> &str {
        "dead_node_elimination"
    }

    fn needs_processing(&self, graph: &ComputeGraph, node: NodeId) -> bool {
        Self::is_dead(graph, node)
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> Result<()> {
        let node = ctx.node_id;
        if !Self::is_dead(ctx.graph, node) {
            return Ok(());
        }

        let outputs = ctx.node()?.output_count();
        trace!(node = ctx.graph.node_name(node), "removing dead node");
        ctx.isolate_and_delete_node(node, &vec![None; outputs], true)?;
        self.removed += 1;
        Ok(())
    }
}
