//! Configuration for rule-population generation.

use ruleflow_types::Time;

/// Parameters of a generated rule population.
#[derive(Debug, Clone)]
pub struct RuleGenConfig {
    /// Number of rules to generate.
    pub num_rules: usize,

    /// Maximum aggregate-condition nesting depth; 0 keeps every condition
    /// basic.
    pub max_aggregation_level: usize,

    /// Number of node ids rules may reference (`0..num_nodes`).
    pub num_nodes: u32,

    /// Horizon the time conditions are scaled to.
    pub max_time: Time,

    /// Cycle aggregation levels evenly across the population instead of
    /// drawing each one at random.
    pub uniform_levels: bool,
}

impl RuleGenConfig {
    /// Create a configuration with the given population size and node
    /// count over a time horizon.
    pub fn new(num_rules: usize, num_nodes: u32, max_time: Time) -> Self {
        Self {
            num_rules,
            max_aggregation_level: 0,
            num_nodes,
            max_time,
            uniform_levels: false,
        }
    }

    /// Set the maximum aggregate nesting depth.
    pub fn with_max_aggregation_level(mut self, level: usize) -> Self {
        self.max_aggregation_level = level;
        self
    }

    /// Cycle aggregation levels evenly across the population.
    pub fn with_uniform_levels(mut self) -> Self {
        self.uniform_levels = true;
        self
    }
}

impl Default for RuleGenConfig {
    fn default() -> Self {
        Self::new(20, 2, 1000.0)
    }
}
