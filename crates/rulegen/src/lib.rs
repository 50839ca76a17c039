//! Randomized rule-population builder.
//!
//! Builds rule sets for calibration experiments: random timers, randomly
//! nested conditions, and random sender/recipient pairs, all drawn from an
//! injected RNG so experiment populations are reproducible from a seed.

mod config;
mod generator;

pub use config::RuleGenConfig;
pub use generator::{generate_rules, RuleGenError};
