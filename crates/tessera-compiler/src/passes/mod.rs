//! Built-in structural node passes.

mod dead_node_elimination;
mod identity_elimination;

pub use dead_node_elimination::DeadNodeEliminationPass;
pub use identity_elimination::IdentityEliminationPass;
