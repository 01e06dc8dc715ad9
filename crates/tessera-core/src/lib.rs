//! Core compute-graph IR and node-pass contract for Tessera.
//!
//! This crate provides the foundational abstractions the optimizer is built on:
//! - Nested compute-graph IR (`ComputeGraph`, `Node`, `GraphId`, `NodeId`)
//! - The node-pass trait and its per-application side channels (`NodePass`,
//!   `PassCtx`, `PassEffects`)
//! - Pass registry for name-based pass construction (`PassRegistry`)
//! - A name-addressed graph builder (`GraphBuilder`)

pub mod ir;
pub mod ir_builder;
pub mod pass;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use ir::{ComputeGraph, EdgeKind, GraphId, Node, NodeId, Subgraph};
pub use ir_builder::GraphBuilder;
pub use pass::{NamesToPass, NodePass, PassCtx, PassEffects, VisitPhase};
pub use registry::{OptLevel, PassRegistry};
pub use types::AttributeValue;

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tessera operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid graph structure: {0}")]
    InvalidGraph(String),

    #[error("Attribute error: {0}")]
    Attribute(String),

    /// Raised by pass implementations for domain failures (bad attribute,
    /// missing edge, ...).
    #[error("Pass error: {0}")]
    Pass(String),

    #[error("io_map for node '{node}' has {actual} entries, but the node has {expected} outputs")]
    IoMapMismatch {
        node: String,
        expected: usize,
        actual: usize,
    },

    #[error("Pass '{pass}' failed on node '{node}': {source}")]
    PassFailed {
        pass: String,
        node: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Graph '{graph}' did not reach a fixed point within {limit} sweeps")]
    SweepLimitExceeded { graph: String, limit: usize },

    #[error("Subgraph nesting exceeds the maximum depth of {0}")]
    DepthLimitExceeded(usize),

    #[error("Unknown pass: {0}")]
    UnknownPass(String),
}
