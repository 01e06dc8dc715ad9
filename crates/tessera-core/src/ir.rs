//! Intermediate representation for the optimizer graph.
//!
//! The IR is a directed graph where:
//! - **Nodes** (`Node`) are operators (e.g., Add, Cast, While)
//! - **Edges** (`EdgeKind`) are either data flows between anchors or control
//!   dependencies
//!
//! Control-flow operators own nested **subgraphs**. All nodes of the root graph
//! and of every nested subgraph live in one arena, so a `NodeId` identifies a
//! node uniquely across the whole nesting and stays valid after other nodes are
//! removed.

use crate::types::AttributeValue;
use crate::{Error, Result};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;

use std::collections::HashMap;

/// Type alias for node identifiers (backed by petgraph NodeIndex).
pub type NodeId = NodeIndex;

/// Identifier of a graph within a `ComputeGraph`.
///
/// `GraphId::ROOT` is the top-level graph; every other id names a subgraph
/// owned by some control-flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub usize);

impl GraphId {
    /// The top-level graph.
    pub const ROOT: GraphId = GraphId(0);

    /// Create a new graph ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the underlying index.
    pub fn index(&self) -> usize {
        self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

/// Weight of an edge in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Data flows from output anchor `src_output` of the source node into
    /// input anchor `dst_input` of the target node.
    Data { src_output: usize, dst_input: usize },

    /// Ordering-only dependency.
    Control,
}

// ─────────────────────────────── Subgraph ────────────────────────────────

/// Bookkeeping for one graph in the nesting.
#[derive(Debug, Clone)]
pub struct Subgraph {
    /// Graph name.
    pub name: String,

    /// Control-flow node owning this graph (`None` for the root).
    parent: Option<NodeId>,

    /// Nodes in insertion order.
    nodes: Vec<NodeId>,
}

impl Subgraph {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            nodes: Vec::new(),
        }
    }

    /// The node owning this graph, if it is nested.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Nodes of this graph, in insertion order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

// ───────────────────────────── ComputeGraph ──────────────────────────────

/// A compute graph with its nested subgraphs.
pub struct ComputeGraph {
    /// Arena of all nodes, root and nested.
    graph: StableGraph<Node, EdgeKind>,

    /// Graph table; index 0 is the root. Removed subgraphs leave `None`.
    subgraphs: Vec<Option<Subgraph>>,

    /// Serial handed to the next added node. Never reused.
    next_serial: u64,
}

impl ComputeGraph {
    /// Create a new graph with an empty root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: StableGraph::new(),
            subgraphs: vec![Some(Subgraph::new(name.into(), None))],
            next_serial: 0,
        }
    }

    // ── Graph access ──

    /// Get a graph of the nesting.
    pub fn subgraph(&self, id: GraphId) -> Result<&Subgraph> {
        self.subgraphs
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::InvalidGraph(format!("Graph {:?} not found", id)))
    }

    fn subgraph_mut(&mut self, id: GraphId) -> Result<&mut Subgraph> {
        self.subgraphs
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::InvalidGraph(format!("Graph {:?} not found", id)))
    }

    /// Name of a graph, or a placeholder when it no longer exists.
    pub fn graph_name(&self, id: GraphId) -> &str {
        self.subgraph(id)
            .map(|g| g.name.as_str())
            .unwrap_or("<removed>")
    }

    /// Nodes directly contained in a graph, in insertion order.
    pub fn graph_nodes(&self, id: GraphId) -> Result<&[NodeId]> {
        Ok(self.subgraph(id)?.nodes())
    }

    /// Number of live graphs, the root included.
    pub fn graph_count(&self) -> usize {
        self.subgraphs.iter().flatten().count()
    }

    // ── Node access ──

    /// Get an immutable reference to a node.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.graph
            .node_weight(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.graph
            .node_weight_mut(id)
            .ok_or_else(|| Error::InvalidGraph(format!("Node {:?} not found", id)))
    }

    /// Serial that the next added node will get.
    ///
    /// Nodes added later have a serial at or above this value, even when
    /// their `NodeId` reuses the slot of a removed node.
    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Check whether a node is still part of the graph.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.graph.contains_node(id)
    }

    /// Get a node's name, or a placeholder when it was removed.
    pub fn node_name(&self, id: NodeId) -> &str {
        self.graph
            .node_weight(id)
            .map(|n| n.name.as_str())
            .unwrap_or("<removed>")
    }

    /// Number of live nodes across all graphs.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges (data and control) across all graphs.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Find a node by its name.
    ///
    /// Searches every graph of the nesting and returns the first match.
    ///
    /// # Errors
    ///
    /// Returns an error if no node with the given name exists.
    pub fn find_node_by_name(&self, name: &str) -> Result<NodeId> {
        self.graph
            .node_indices()
            .find(|&id| self.graph[id].name == name)
            .ok_or_else(|| Error::InvalidGraph(format!("Node '{}' not found", name)))
    }

    /// Return the ancestor of `id` that lives directly in `graph`.
    ///
    /// A node of `graph` is its own ancestor. For a nested node the owner chain
    /// is followed up through parent control-flow nodes. Returns `None` when
    /// the node is gone or is not nested below `graph`.
    pub fn ancestor_in(&self, id: NodeId, graph: GraphId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let owner = self.graph.node_weight(current)?.owner;
            if owner == graph {
                return Some(current);
            }
            current = self.subgraphs.get(owner.index())?.as_ref()?.parent?;
        }
    }

    // ── Topology queries ──

    /// The producer feeding input anchor `input` of a node, with its output anchor.
    pub fn input_producer(&self, id: NodeId, input: usize) -> Option<(NodeId, usize)> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .find_map(|e| match *e.weight() {
                EdgeKind::Data {
                    src_output,
                    dst_input,
                } if dst_input == input => Some((e.source(), src_output)),
                _ => None,
            })
    }

    /// Consumers of output anchor `output` of a node, with their input anchors.
    pub fn output_consumers(&self, id: NodeId, output: usize) -> Vec<(NodeId, usize)> {
        let mut consumers: Vec<(NodeId, usize)> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Data {
                    src_output,
                    dst_input,
                } if src_output == output => Some((e.target(), dst_input)),
                _ => None,
            })
            .collect();
        consumers.sort();
        consumers
    }

    /// Producers of a node's data inputs, ordered by input anchor.
    pub fn in_data_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(id, Direction::Incoming)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Data { dst_input, .. } => Some((dst_input, e.source())),
                EdgeKind::Control => None,
            })
            .collect();
        edges.sort();
        dedup_in_order(edges.into_iter().map(|(_, n)| n))
    }

    /// Consumers of a node's data outputs, ordered by output anchor.
    pub fn out_data_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut edges: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(id, Direction::Outgoing)
            .filter_map(|e| match *e.weight() {
                EdgeKind::Data { src_output, .. } => Some((src_output, e.target())),
                EdgeKind::Control => None,
            })
            .collect();
        edges.sort();
        dedup_in_order(edges.into_iter().map(|(_, n)| n))
    }

    /// Control predecessors of a node.
    pub fn in_control_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.control_neighbors(id, Direction::Incoming)
    }

    /// Control successors of a node.
    pub fn out_control_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.control_neighbors(id, Direction::Outgoing)
    }

    fn control_neighbors(&self, id: NodeId, dir: Direction) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .graph
            .edges_directed(id, dir)
            .filter(|e| *e.weight() == EdgeKind::Control)
            .map(|e| match dir {
                Direction::Incoming => e.source(),
                Direction::Outgoing => e.target(),
            })
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }

    /// All direct predecessors (data first, then control), deduplicated.
    pub fn in_nodes(&self, id: NodeId) -> Vec<NodeId> {
        dedup_in_order(
            self.in_data_nodes(id)
                .into_iter()
                .chain(self.in_control_nodes(id)),
        )
    }

    /// All direct successors (data first, then control), deduplicated.
    pub fn out_nodes(&self, id: NodeId) -> Vec<NodeId> {
        dedup_in_order(
            self.out_data_nodes(id)
                .into_iter()
                .chain(self.out_control_nodes(id)),
        )
    }

    /// Check whether any data edge runs from `src` to `dst`.
    pub fn has_data_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.graph
            .edges_directed(src, Direction::Outgoing)
            .any(|e| e.target() == dst && matches!(e.weight(), EdgeKind::Data { .. }))
    }

    /// Check whether a control edge runs from `src` to `dst`.
    pub fn has_control_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.graph
            .edges_directed(src, Direction::Outgoing)
            .any(|e| e.target() == dst && *e.weight() == EdgeKind::Control)
    }

    // ── Graph mutation ──

    /// Add a node to a graph and return its ID.
    pub fn add_node(&mut self, graph: GraphId, mut node: Node) -> Result<NodeId> {
        self.subgraph(graph)?;
        node.owner = graph;
        node.subgraphs.clear();
        node.serial = self.next_serial;
        self.next_serial += 1;
        let id = self.graph.add_node(node);
        self.subgraph_mut(graph)?.nodes.push(id);
        Ok(id)
    }

    /// Attach a new, empty subgraph to a control-flow node.
    pub fn add_subgraph(&mut self, parent: NodeId, name: impl Into<String>) -> Result<GraphId> {
        self.node(parent)?;
        let id = GraphId::new(self.subgraphs.len());
        self.subgraphs
            .push(Some(Subgraph::new(name.into(), Some(parent))));
        self.node_mut(parent)?.subgraphs.push(id);
        Ok(id)
    }

    /// Connect output anchor `src_output` of `src` to input anchor `dst_input` of `dst`.
    ///
    /// Both nodes must live in the same graph, the anchors must exist, and the
    /// input anchor must not already have a producer.
    pub fn add_data_edge(
        &mut self,
        src: NodeId,
        src_output: usize,
        dst: NodeId,
        dst_input: usize,
    ) -> Result<()> {
        let src_node = self.node(src)?;
        let dst_node = self.node(dst)?;

        if src_node.owner != dst_node.owner {
            return Err(Error::InvalidGraph(format!(
                "Cannot connect '{}' to '{}': nodes live in different graphs",
                src_node.name, dst_node.name
            )));
        }
        if src_output >= src_node.output_count {
            return Err(Error::InvalidGraph(format!(
                "Node '{}' has no output anchor {} (it has {})",
                src_node.name, src_output, src_node.output_count
            )));
        }
        if dst_input >= dst_node.input_count {
            return Err(Error::InvalidGraph(format!(
                "Node '{}' has no input anchor {} (it has {})",
                dst_node.name, dst_input, dst_node.input_count
            )));
        }
        if self.input_producer(dst, dst_input).is_some() {
            return Err(Error::InvalidGraph(format!(
                "Input anchor {} of node '{}' is already connected",
                dst_input, dst_node.name
            )));
        }

        self.graph.add_edge(
            src,
            dst,
            EdgeKind::Data {
                src_output,
                dst_input,
            },
        );
        Ok(())
    }

    /// Add a control edge from `src` to `dst`. Duplicate edges are ignored.
    pub fn add_control_edge(&mut self, src: NodeId, dst: NodeId) -> Result<()> {
        let src_node = self.node(src)?;
        let dst_node = self.node(dst)?;
        if src_node.owner != dst_node.owner {
            return Err(Error::InvalidGraph(format!(
                "Cannot add control edge '{}' -> '{}': nodes live in different graphs",
                src_node.name, dst_node.name
            )));
        }
        if !self.has_control_edge(src, dst) {
            self.graph.add_edge(src, dst, EdgeKind::Control);
        }
        Ok(())
    }

    /// Detach a node from its neighbors, splicing data flow around it.
    ///
    /// `io_map` is indexed by output anchor: consumers of output `i` are
    /// reconnected to the producer of input anchor `io_map[i]`, or left
    /// unconnected when the entry is `None`. Control predecessors are linked
    /// to control successors. The node itself stays in the graph, edgeless.
    ///
    /// # Errors
    ///
    /// Returns `Error::IoMapMismatch` when `io_map` does not have exactly one
    /// entry per output anchor, and `Error::InvalidGraph` when it names an
    /// input anchor the node does not have.
    pub fn isolate_node(&mut self, id: NodeId, io_map: &[Option<usize>]) -> Result<()> {
        let node = self.node(id)?;
        if io_map.len() != node.output_count {
            return Err(Error::IoMapMismatch {
                node: node.name.clone(),
                expected: node.output_count,
                actual: io_map.len(),
            });
        }

        let mut relinks = Vec::new();
        for (output, mapped) in io_map.iter().enumerate() {
            let Some(input) = *mapped else {
                continue;
            };
            if input >= node.input_count {
                return Err(Error::InvalidGraph(format!(
                    "io_map of node '{}' maps output {} to missing input {}",
                    node.name, output, input
                )));
            }
            if let Some((producer, src_output)) = self.input_producer(id, input) {
                for (consumer, dst_input) in self.output_consumers(id, output) {
                    relinks.push((producer, src_output, consumer, dst_input));
                }
            }
        }

        let control_preds = self.in_control_nodes(id);
        let control_succs = self.out_control_nodes(id);

        let attached: Vec<EdgeIndex> = self
            .graph
            .edges_directed(id, Direction::Incoming)
            .chain(self.graph.edges_directed(id, Direction::Outgoing))
            .map(|e| e.id())
            .collect();
        for edge in attached {
            self.graph.remove_edge(edge);
        }

        for (producer, src_output, consumer, dst_input) in relinks {
            self.graph.add_edge(
                producer,
                consumer,
                EdgeKind::Data {
                    src_output,
                    dst_input,
                },
            );
        }
        for &pred in &control_preds {
            for &succ in &control_succs {
                if pred != succ && !self.has_control_edge(pred, succ) {
                    self.graph.add_edge(pred, succ, EdgeKind::Control);
                }
            }
        }

        Ok(())
    }

    /// Remove a node from the graph.
    ///
    /// Subgraphs owned by the node are removed with it, recursively. With
    /// `StableGraph`, other node indices remain valid.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.graph.remove_node(id).ok_or_else(|| {
            Error::InvalidGraph(format!("Cannot remove node {:?}: not found", id))
        })?;

        if let Ok(owner) = self.subgraph_mut(node.owner) {
            owner.nodes.retain(|&n| n != id);
        }

        for sub in node.subgraphs {
            let Some(subgraph) = self.subgraphs.get_mut(sub.index()).and_then(Option::take)
            else {
                continue;
            };
            for nested in subgraph.nodes {
                if self.graph.contains_node(nested) {
                    self.remove_node(nested)?;
                }
            }
        }

        Ok(())
    }
}

fn dedup_in_order(nodes: impl Iterator<Item = NodeId>) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    for node in nodes {
        if !out.contains(&node) {
            out.push(node);
        }
    }
    out
}

// ──────────────────────────────── Node ───────────────────────────────────

/// A node in the compute graph: one operator with anchored inputs/outputs.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name (unique by convention, used in diagnostics).
    pub name: String,

    /// Operator type (e.g., "Add", "Identity", "While").
    pub op_type: String,

    /// Operator attributes.
    pub attributes: HashMap<String, AttributeValue>,

    /// Number of input anchors.
    input_count: usize,

    /// Number of output anchors.
    output_count: usize,

    /// Graph that directly contains this node.
    owner: GraphId,

    /// Subgraphs owned by this node (control-flow operators only).
    subgraphs: Vec<GraphId>,

    /// Insertion serial, assigned by `ComputeGraph::add_node`.
    serial: u64,
}

impl Node {
    /// Create a node with no anchors.
    pub fn new(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            attributes: HashMap::new(),
            input_count: 0,
            output_count: 0,
            owner: GraphId::ROOT,
            subgraphs: Vec::new(),
            serial: 0,
        }
    }

    /// Set the number of input and output anchors.
    pub fn with_anchors(mut self, inputs: usize, outputs: usize) -> Self {
        self.input_count = inputs;
        self.output_count = outputs;
        self
    }

    /// Get the operator type.
    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Graph that directly contains this node.
    pub fn owner(&self) -> GraphId {
        self.owner
    }

    /// Insertion serial. Unlike `NodeId`, never shared with a removed node.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Subgraphs owned by this node.
    pub fn subgraphs(&self) -> &[GraphId] {
        &self.subgraphs
    }

    pub fn has_subgraphs(&self) -> bool {
        !self.subgraphs.is_empty()
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(key.into(), value);
    }

    /// Get an attribute.
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (ComputeGraph, NodeId, NodeId, NodeId) {
        let mut graph = ComputeGraph::new("g");
        let a = graph
            .add_node(GraphId::ROOT, Node::new("a", "Data").with_anchors(0, 1))
            .unwrap();
        let b = graph
            .add_node(GraphId::ROOT, Node::new("b", "Identity").with_anchors(1, 1))
            .unwrap();
        let c = graph
            .add_node(GraphId::ROOT, Node::new("c", "Relu").with_anchors(1, 1))
            .unwrap();
        graph.add_data_edge(a, 0, b, 0).unwrap();
        graph.add_data_edge(b, 0, c, 0).unwrap();
        (graph, a, b, c)
    }

    #[test]
    fn test_create_empty_graph() {
        let graph = ComputeGraph::new("main");
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.graph_count(), 1);
        assert_eq!(graph.graph_name(GraphId::ROOT), "main");
        assert!(graph.graph_nodes(GraphId::ROOT).unwrap().is_empty());
    }

    #[test]
    fn test_add_node_and_edges() {
        let (graph, a, b, c) = chain();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.graph_nodes(GraphId::ROOT).unwrap(), &[a, b, c]);
        assert_eq!(graph.input_producer(b, 0), Some((a, 0)));
        assert_eq!(graph.output_consumers(b, 0), vec![(c, 0)]);
        assert_eq!(graph.in_nodes(b), vec![a]);
        assert_eq!(graph.out_nodes(b), vec![c]);
        assert!(graph.has_data_edge(a, b));
        assert!(!graph.has_data_edge(a, c));
    }

    #[test]
    fn test_input_anchor_takes_one_producer() {
        let (mut graph, a, _, c) = chain();
        let err = graph.add_data_edge(a, 0, c, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidGraph(_)));
    }

    #[test]
    fn test_stable_indices_after_remove() {
        let (mut graph, a, b, c) = chain();

        graph.remove_node(b).unwrap();

        assert!(!graph.contains_node(b));
        assert!(graph.node(a).is_ok());
        assert!(graph.node(c).is_ok());
        assert_eq!(graph.graph_nodes(GraphId::ROOT).unwrap(), &[a, c]);
        assert!(graph.out_nodes(a).is_empty());
    }

    #[test]
    fn test_isolate_splices_data_flow() {
        let (mut graph, a, b, c) = chain();

        graph.isolate_node(b, &[Some(0)]).unwrap();

        assert!(graph.has_data_edge(a, c));
        assert_eq!(graph.input_producer(c, 0), Some((a, 0)));
        assert!(graph.in_nodes(b).is_empty());
        assert!(graph.out_nodes(b).is_empty());
    }

    #[test]
    fn test_isolate_drops_unmapped_outputs() {
        let (mut graph, a, b, c) = chain();

        graph.isolate_node(b, &[None]).unwrap();

        assert!(!graph.has_data_edge(a, c));
        assert_eq!(graph.input_producer(c, 0), None);
    }

    #[test]
    fn test_isolate_relinks_control_edges() {
        let (mut graph, a, b, c) = chain();
        let d = graph
            .add_node(GraphId::ROOT, Node::new("d", "NoOp"))
            .unwrap();
        graph.add_control_edge(d, b).unwrap();
        graph.add_control_edge(b, c).unwrap();

        graph.isolate_node(b, &[Some(0)]).unwrap();

        assert!(graph.has_control_edge(d, c));
        assert!(graph.has_data_edge(a, c));
    }

    #[test]
    fn test_isolate_rejects_mismatched_io_map() {
        let (mut graph, _, b, _) = chain();

        let err = graph.isolate_node(b, &[Some(0), None]).unwrap_err();

        assert!(matches!(
            err,
            Error::IoMapMismatch {
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_remove_node_removes_subgraphs() {
        let mut graph = ComputeGraph::new("g");
        let while_node = graph
            .add_node(GraphId::ROOT, Node::new("loop", "While"))
            .unwrap();
        let body = graph.add_subgraph(while_node, "body").unwrap();
        let inner = graph
            .add_node(body, Node::new("inner", "If"))
            .unwrap();
        let nested = graph.add_subgraph(inner, "then").unwrap();
        let leaf = graph.add_node(nested, Node::new("leaf", "Add")).unwrap();

        assert_eq!(graph.graph_count(), 3);
        graph.remove_node(while_node).unwrap();

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.graph_count(), 1);
        assert!(!graph.contains_node(inner));
        assert!(!graph.contains_node(leaf));
        assert!(graph.subgraph(body).is_err());
    }

    #[test]
    fn test_ancestor_in() {
        let mut graph = ComputeGraph::new("g");
        let outer = graph
            .add_node(GraphId::ROOT, Node::new("outer", "If"))
            .unwrap();
        let sub = graph.add_subgraph(outer, "then").unwrap();
        let inner = graph.add_node(sub, Node::new("inner", "Add")).unwrap();

        assert_eq!(graph.ancestor_in(inner, GraphId::ROOT), Some(outer));
        assert_eq!(graph.ancestor_in(inner, sub), Some(inner));
        assert_eq!(graph.ancestor_in(outer, sub), None);
    }

    #[test]
    fn test_cross_graph_edges_rejected() {
        let mut graph = ComputeGraph::new("g");
        let outer = graph
            .add_node(GraphId::ROOT, Node::new("outer", "If").with_anchors(1, 1))
            .unwrap();
        let sub = graph.add_subgraph(outer, "then").unwrap();
        let inner = graph
            .add_node(sub, Node::new("inner", "Add").with_anchors(1, 1))
            .unwrap();

        assert!(graph.add_data_edge(inner, 0, outer, 0).is_err());
        assert!(graph.add_control_edge(outer, inner).is_err());
    }

    #[test]
    fn test_find_node_by_name() {
        let (graph, _, b, _) = chain();
        assert_eq!(graph.find_node_by_name("b").unwrap(), b);
        assert!(graph.find_node_by_name("missing").is_err());
    }

    #[test]
    fn test_serial_not_reused_with_slot() {
        let (mut graph, _, b, _) = chain();
        let old_serial = graph.node(b).unwrap().serial();
        let watermark = graph.next_serial();

        graph.remove_node(b).unwrap();
        let fused = graph
            .add_node(GraphId::ROOT, Node::new("fused", "Relu").with_anchors(1, 1))
            .unwrap();

        let serial = graph.node(fused).unwrap().serial();
        assert!(serial >= watermark);
        assert_ne!(serial, old_serial);
        assert_eq!(graph.next_serial(), watermark + 1);
    }
}
