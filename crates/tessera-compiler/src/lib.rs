//! Node-level graph optimizer for tessera.
//!
//! This crate drives [`NodePass`](tessera_core::NodePass) implementations over
//! a nested [`ComputeGraph`] until no pass asks for more work:
//!
//! 1. **Seeding** - every graph's nodes are queued in stable order
//! 2. **Sweeping** - each node runs through the pass list; passes request
//!    revisits, report deletions and suspend or resume nodes
//! 3. **Nesting** - subgraph owners are visited before and after their
//!    subgraphs reach their own fixed point
//! 4. **Finishing** - leaked suspensions and `on_finish_graph` hooks get a
//!    last chance to add work before the graph is declared done
//!
//! # Example
//!
//! ```
//! use tessera_compiler::{EngineConfig, optimize};
//! use tessera_core::GraphBuilder;
//!
//! # fn main() -> tessera_core::Result<()> {
//! let mut builder = GraphBuilder::new("main");
//! builder.node("x", "Data", 0, 1)?;
//! builder.node("id", "Identity", 1, 1)?;
//! builder.node("unused", "Relu", 1, 1)?;
//! builder.node("out", "NetOutput", 1, 0)?;
//! builder
//!     .data_edge("x", 0, "id", 0)?
//!     .data_edge("x", 0, "unused", 0)?
//!     .data_edge("id", 0, "out", 0)?;
//! let mut graph = builder.build();
//!
//! optimize(
//!     &mut graph,
//!     &["identity_elimination", "dead_node_elimination"],
//!     EngineConfig::default(),
//! )?;
//!
//! assert_eq!(graph.node_count(), 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod passes;
pub mod scheduler;
pub mod state;

pub use config::EngineConfig;
pub use passes::{DeadNodeEliminationPass, IdentityEliminationPass};
pub use scheduler::GePass;

// Re-export commonly used types from tessera-core
pub use tessera_core::{
    ComputeGraph, Error, NamesToPass, NodePass, OptLevel, PassCtx, PassRegistry, Result,
    VisitPhase,
};

/// Registry holding the built-in passes.
///
/// Out-of-tree passes can be added to the returned registry with
/// `PassRegistry::register`.
pub fn default_registry() -> PassRegistry {
    let mut registry = PassRegistry::new();
    registry
        .register("identity_elimination", OptLevel::O1, || {
            Box::new(IdentityEliminationPass::new())
        })
        .register("dead_node_elimination", OptLevel::O1, || {
            Box::new(DeadNodeEliminationPass::new())
        });
    registry
}

/// Convenience function: builds the named passes from the default registry
/// and runs them to a fixed point with the pass filter enabled.
///
/// # Arguments
///
/// * `graph` - The graph to optimize in place
/// * `pass_names` - Registered pass names, in application order
/// * `config` - Scheduler configuration
///
/// # Errors
///
/// Returns an error if:
/// - A pass name is not registered
/// - Any pass fails
/// - A graph exceeds the configured sweep or nesting limits
#[tracing::instrument(skip_all, fields(num_passes = pass_names.len()))]
pub fn optimize(graph: &mut ComputeGraph, pass_names: &[&str], config: EngineConfig) -> Result<()> {
    let registry = default_registry();
    let mut passes = registry.build(pass_names)?;
    GePass::new(graph)
        .with_config(config)
        .with_registry(&registry)
        .run(&mut passes, true)
}
