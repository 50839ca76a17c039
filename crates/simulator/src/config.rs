//! Configuration types for experiment runs.

use ruleflow_rulegen::RuleGenConfig;
use ruleflow_types::Time;

/// Configuration for one calibration experiment.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// Simulation horizon.
    pub duration: Time,

    /// Time-step granularity for generation and analysis.
    pub step: Time,

    /// Seed for the experiment's root RNG.
    pub seed: u64,

    /// Maximum generation retries before giving up on a population that
    /// produces no events.
    pub max_attempts: usize,

    /// Rule-population parameters.
    pub rulegen: RuleGenConfig,
}

impl ExperimentConfig {
    /// Create a configuration over the given horizon.
    ///
    /// The rule population's time conditions are scaled to the same
    /// horizon.
    pub fn new(duration: Time) -> Self {
        Self {
            duration,
            step: 1.0,
            seed: 12345,
            max_attempts: 50,
            rulegen: RuleGenConfig {
                max_time: duration,
                ..RuleGenConfig::default()
            },
        }
    }

    /// Set the step granularity.
    pub fn with_step(mut self, step: Time) -> Self {
        self.step = step;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the generation retry limit.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Replace the rule-population parameters.
    pub fn with_rulegen(mut self, rulegen: RuleGenConfig) -> Self {
        self.rulegen = rulegen;
        self
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new(1000.0)
    }
}
