//! Identity elimination pass.
//!
//! Splices `Identity` nodes out of the graph so their consumers read straight
//! from the identity's producer.

use tessera_core::{ComputeGraph, NodeId, NodePass, PassCtx, Result};
use tracing::trace;

/// Pass that removes single-input/single-output `Identity` nodes.
///
/// An identity without a producer is kept: removing it would leave its
/// consumers with a dangling input.
pub struct IdentityEliminationPass {
    removed: usize,
}

impl IdentityEliminationPass {
    /// Create a new identity elimination pass.
    pub fn new() -> Self {
        Self { removed: 0 }
    }

    /// Number of nodes removed so far.
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl Default for IdentityEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl NodePass for IdentityEliminationPass {
    fn name(&self) -> &str {
        "identity_elimination"
    }

    fn needs_processing(&self, graph: &ComputeGraph, node: NodeId) -> bool {
        graph.node(node).is_ok_and(|n| {
            n.op_type() == "Identity" && n.input_count() == 1 && n.output_count() == 1
        })
    }

    fn run(&mut self, ctx: &mut PassCtx<'_>) -> Result<()> {
        let node = ctx.node_id;
        if ctx.graph.input_producer(node, 0).is_none() {
            return Ok(());
        }

        trace!(node = ctx.graph.node_name(node), "removing identity");
        ctx.isolate_and_delete_node(node, &[Some(0)], false)?;
        self.removed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{GraphBuilder, GraphId, PassEffects, VisitPhase};

    #[test]
    fn test_removes_identity_and_relinks() {
        let mut builder = GraphBuilder::new("g");
        let x = builder.node("x", "Data", 0, 1).unwrap();
        let id = builder.node("id", "Identity", 1, 1).unwrap();
        let relu = builder.node("relu", "Relu", 1, 1).unwrap();
        let out = builder.node("out", "NetOutput", 1, 0).unwrap();
        builder
            .data_edge("x", 0, "id", 0)
            .unwrap()
            .data_edge("id", 0, "relu", 0)
            .unwrap()
            .data_edge("id", 0, "out", 0)
            .unwrap();
        let mut graph = builder.build();

        let mut pass = IdentityEliminationPass::new();
        assert!(pass.needs_processing(&graph, id));
        assert!(!pass.needs_processing(&graph, relu));

        let mut effects = PassEffects::new();
        let mut ctx = PassCtx::new(&mut graph, id, GraphId::ROOT, VisitPhase::Single, &mut effects);
        pass.run(&mut ctx).unwrap();

        assert_eq!(pass.removed(), 1);
        assert!(!graph.contains_node(id));
        assert_eq!(graph.input_producer(relu, 0), Some((x, 0)));
        assert_eq!(graph.input_producer(out, 0), Some((x, 0)));
        assert_eq!(effects.nodes_deleted(), &[id]);
        assert_eq!(effects.nodes_need_repass(), &[x, relu, out]);
    }

    #[test]
    fn test_keeps_identity_without_producer() {
        let mut builder = GraphBuilder::new("g");
        let id = builder.node("id", "Identity", 1, 1).unwrap();
        let mut graph = builder.build();

        let mut pass = IdentityEliminationPass::new();
        let mut effects = PassEffects::new();
        let mut ctx = PassCtx::new(&mut graph, id, GraphId::ROOT, VisitPhase::Single, &mut effects);
        pass.run(&mut ctx).unwrap();

        assert!(graph.contains_node(id));
        assert!(effects.is_empty());
        assert_eq!(pass.removed(), 0);
    }

    #[test]
    fn test_skips_multi_output_identity() {
        let mut builder = GraphBuilder::new("g");
        let id = builder.node("id", "Identity", 2, 2).unwrap();
        let graph = builder.build();

        assert!(!IdentityEliminationPass::new().needs_processing(&graph, id));
    }
}
