//! Name-addressed construction of compute graphs.

use crate::ir::{ComputeGraph, GraphId, Node, NodeId};
use crate::{Error, Result};
use std::collections::HashMap;

/// Builds a `ComputeGraph` by node name.
///
/// Node names must be unique across the whole nesting; edges and subgraphs
/// are then addressed by name instead of by id.
///
/// # Example
///
/// ```
/// use tessera_core::GraphBuilder;
///
/// # fn main() -> tessera_core::Result<()> {
/// let mut builder = GraphBuilder::new("main");
/// builder.node("x", "Data", 0, 1)?;
/// builder.node("id", "Identity", 1, 1)?;
/// builder.node("out", "NetOutput", 1, 0)?;
/// builder.data_edge("x", 0, "id", 0)?.data_edge("id", 0, "out", 0)?;
/// let graph = builder.build();
/// assert_eq!(graph.node_count(), 3);
/// # Ok(())
/// # }
/// ```
pub struct GraphBuilder {
    graph: ComputeGraph,
    names: HashMap<String, NodeId>,
}

impl GraphBuilder {
    /// Create a builder with an empty root graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: ComputeGraph::new(name),
            names: HashMap::new(),
        }
    }

    /// Add a node to the root graph.
    pub fn node(
        &mut self,
        name: &str,
        op_type: &str,
        inputs: usize,
        outputs: usize,
    ) -> Result<NodeId> {
        self.node_in(GraphId::ROOT, name, op_type, inputs, outputs)
    }

    /// Add a node to a specific graph.
    pub fn node_in(
        &mut self,
        graph: GraphId,
        name: &str,
        op_type: &str,
        inputs: usize,
        outputs: usize,
    ) -> Result<NodeId> {
        if self.names.contains_key(name) {
            return Err(Error::InvalidGraph(format!(
                "Duplicate node name '{}'",
                name
            )));
        }
        let node = Node::new(name, op_type).with_anchors(inputs, outputs);
        let id = self.graph.add_node(graph, node)?;
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Attach a new subgraph to the named node.
    pub fn subgraph(&mut self, parent: &str, name: &str) -> Result<GraphId> {
        let parent = self.id(parent)?;
        self.graph.add_subgraph(parent, name)
    }

    /// Connect `src:src_output` to `dst:dst_input`.
    pub fn data_edge(
        &mut self,
        src: &str,
        src_output: usize,
        dst: &str,
        dst_input: usize,
    ) -> Result<&mut Self> {
        let (src, dst) = (self.id(src)?, self.id(dst)?);
        self.graph.add_data_edge(src, src_output, dst, dst_input)?;
        Ok(self)
    }

    /// Add a control edge `src -> dst`.
    pub fn control_edge(&mut self, src: &str, dst: &str) -> Result<&mut Self> {
        let (src, dst) = (self.id(src)?, self.id(dst)?);
        self.graph.add_control_edge(src, dst)?;
        Ok(self)
    }

    /// Look up a node added through this builder.
    pub fn id(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidGraph(format!("Node '{}' not found", name)))
    }

    /// Mutable access to a node, e.g. to set attributes.
    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        let id = self.id(name)?;
        self.graph.node_mut(id)
    }

    /// Finish building.
    pub fn build(self) -> ComputeGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    #[test]
    fn test_build_nested_graph() {
        let mut builder = GraphBuilder::new("main");
        builder.node("cond", "Data", 0, 1).unwrap();
        builder.node("if", "If", 1, 1).unwrap();
        builder.data_edge("cond", 0, "if", 0).unwrap();
        let then_branch = builder.subgraph("if", "then").unwrap();
        let inner = builder
            .node_in(then_branch, "inner", "Add", 2, 1)
            .unwrap();

        let graph = builder.build();

        assert_eq!(graph.graph_count(), 2);
        assert_eq!(graph.graph_nodes(then_branch).unwrap(), &[inner]);
        let if_node = graph.find_node_by_name("if").unwrap();
        assert_eq!(graph.node(if_node).unwrap().subgraphs(), &[then_branch]);
        assert_eq!(graph.node(inner).unwrap().owner(), then_branch);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut builder = GraphBuilder::new("main");
        builder.node("a", "Data", 0, 1).unwrap();
        assert!(builder.node("a", "Data", 0, 1).is_err());
    }

    #[test]
    fn test_set_attribute_through_builder() {
        let mut builder = GraphBuilder::new("main");
        builder.node("cast", "Cast", 1, 1).unwrap();
        builder
            .node_mut("cast")
            .unwrap()
            .set_attribute("dst_type", AttributeValue::from("float16"));

        let graph = builder.build();
        let cast = graph.find_node_by_name("cast").unwrap();
        assert_eq!(
            graph
                .node(cast)
                .unwrap()
                .get_attribute("dst_type")
                .and_then(AttributeValue::as_str),
            Some("float16")
        );
    }
}
