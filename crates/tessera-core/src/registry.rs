//! Pass registry for name-based pass construction.

use crate::pass::{NamesToPass, NodePass};
use crate::{Error, Result};
use std::collections::HashMap;

/// Optimization level a pass is registered under.
///
/// The scheduler's disabled-pass filter runs a pass only when its level is at
/// most the configured level. The levels carry no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum OptLevel {
    /// Passes required for correctness (legalization).
    O0,
    /// Cheap structural cleanups.
    O1,
    /// Default optimization set.
    #[default]
    O2,
    /// Expensive or experimental rewrites.
    O3,
}

type PassFactory = Box<dyn Fn() -> Box<dyn NodePass>>;

struct Registration {
    level: OptLevel,
    factory: PassFactory,
}

/// Registry of pass constructors.
///
/// Maps pass names (e.g., "identity_elimination") to a constructor and the
/// optimization level the pass is registered under. Out-of-tree passes can be
/// registered the same way as the built-in ones.
///
/// # Example
///
/// ```ignore
/// let mut registry = PassRegistry::new();
/// registry.register("identity_elimination", OptLevel::O1, || {
///     Box::new(IdentityEliminationPass::new())
/// });
///
/// let passes = registry.build(&["identity_elimination"])?;
/// ```
pub struct PassRegistry {
    passes: HashMap<String, Registration>,
}

impl PassRegistry {
    /// Create a new empty pass registry.
    pub fn new() -> Self {
        Self {
            passes: HashMap::new(),
        }
    }

    /// Register a pass constructor under `name`.
    ///
    /// Returns `self` for method chaining.
    pub fn register<F>(&mut self, name: &str, level: OptLevel, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn NodePass> + 'static,
    {
        self.passes.insert(
            name.to_string(),
            Registration {
                level,
                factory: Box::new(factory),
            },
        );
        self
    }

    /// Instantiate the named passes, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownPass` for the first name that is not registered.
    pub fn build(&self, names: &[&str]) -> Result<NamesToPass> {
        names
            .iter()
            .map(|&name| {
                let registration = self
                    .passes
                    .get(name)
                    .ok_or_else(|| Error::UnknownPass(name.to_string()))?;
                Ok((name.to_string(), (registration.factory)()))
            })
            .collect()
    }

    /// Optimization level a pass is registered under.
    pub fn level(&self, name: &str) -> Option<OptLevel> {
        self.passes.get(name).map(|r| r.level)
    }

    /// Check if a pass is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.passes.contains_key(name)
    }

    /// Get the number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Iterate over all registered pass names.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.keys().map(|s| s.as_str())
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
