//! Scheduler configuration.

use std::collections::HashSet;
use tessera_core::OptLevel;

/// Default per-graph cap on sweeps before the scheduler gives up.
pub const DEFAULT_MAX_SWEEPS: usize = 1024;

/// Default cap on subgraph nesting.
pub const DEFAULT_MAX_SUBGRAPH_DEPTH: usize = 20;

/// Configuration for a `GePass` run.
///
/// `opt_level` and `disabled_passes` are only consulted when the scheduler
/// runs with its pass filter enabled.
///
/// # Example
///
/// ```
/// use tessera_compiler::EngineConfig;
/// use tessera_core::OptLevel;
///
/// let config = EngineConfig::new()
///     .with_opt_level(OptLevel::O1)
///     .disable_pass("dead_node_elimination")
///     .with_max_sweeps(Some(64));
///
/// assert!(!config.is_pass_enabled("dead_node_elimination", Some(OptLevel::O1)));
/// assert!(!config.is_pass_enabled("fusion", Some(OptLevel::O3)));
/// assert!(config.is_pass_enabled("custom", None));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Highest optimization level whose passes run.
    pub opt_level: OptLevel,

    /// Pass names excluded regardless of level.
    pub disabled_passes: HashSet<String>,

    /// Per-graph sweep cap; `None` disables the cap.
    pub max_sweeps: Option<usize>,

    /// Deepest subgraph nesting the scheduler recurses into.
    pub max_subgraph_depth: usize,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            opt_level: OptLevel::default(),
            disabled_passes: HashSet::new(),
            max_sweeps: Some(DEFAULT_MAX_SWEEPS),
            max_subgraph_depth: DEFAULT_MAX_SUBGRAPH_DEPTH,
        }
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn disable_pass(mut self, name: impl Into<String>) -> Self {
        self.disabled_passes.insert(name.into());
        self
    }

    pub fn with_max_sweeps(mut self, limit: Option<usize>) -> Self {
        self.max_sweeps = limit;
        self
    }

    pub fn with_max_subgraph_depth(mut self, depth: usize) -> Self {
        self.max_subgraph_depth = depth;
        self
    }

    /// Whether a pass survives the filter.
    ///
    /// `level` is the level the pass is registered under; unregistered passes
    /// are only subject to the disabled list.
    pub fn is_pass_enabled(&self, name: &str, level: Option<OptLevel>) -> bool {
        if self.disabled_passes.contains(name) {
            return false;
        }
        level.is_none_or(|level| level <= self.opt_level)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.opt_level, OptLevel::O2);
        assert_eq!(config.max_sweeps, Some(DEFAULT_MAX_SWEEPS));
        assert_eq!(config.max_subgraph_depth, DEFAULT_MAX_SUBGRAPH_DEPTH);
        assert!(config.disabled_passes.is_empty());
    }

    #[test]
    fn test_level_filter() {
        let config = EngineConfig::new().with_opt_level(OptLevel::O1);
        assert!(config.is_pass_enabled("a", Some(OptLevel::O0)));
        assert!(config.is_pass_enabled("a", Some(OptLevel::O1)));
        assert!(!config.is_pass_enabled("a", Some(OptLevel::O2)));
    }

    #[test]
    fn test_disabled_pass_wins_over_level() {
        let config = EngineConfig::new().disable_pass("a");
        assert!(!config.is_pass_enabled("a", Some(OptLevel::O0)));
        assert!(!config.is_pass_enabled("a", None));
        assert!(config.is_pass_enabled("b", None));
    }
}
