//! Calibration experiment driver.
//!
//! Wires the pieces together for an end-to-end run: build a random rule
//! population, generate a sequence (regenerating when a run produces no
//! events), analyse it with the same stage, and aggregate how far each
//! rule's empirical firing rate landed from its theoretical probability.
//!
//! # Example
//!
//! ```ignore
//! use ruleflow_simulator::{run_experiment, ExperimentConfig};
//!
//! let config = ExperimentConfig::default().with_seed(7);
//! let report = run_experiment(&config)?;
//! println!("coverage {:.3}", report.coverage);
//! ```

mod config;
mod experiment;

pub use config::ExperimentConfig;
pub use experiment::{run_experiment, ExperimentError, ExperimentReport};
