//! Time-stepped sequence generation and attribution analysis.
//!
//! A [`Stage`] owns an ordered rule collection and a step granularity, and
//! exposes the two entry points of the system:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Stage                             │
//! │                                                          │
//! │  generate(duration, rng)                                 │
//! │    time-stepped loop: commit pending -> query rules      │
//! │    -> advance to min(step boundary, earliest pending)    │
//! │                          │                               │
//! │                          ▼                               │
//! │                ordered Event sequence                    │
//! │                          │                               │
//! │  analyse(sequence, duration)                             │
//! │    deterministic opportunity sweep -> window matching    │
//! │    -> greedy disambiguation -> exact binomial tests      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Generation samples randomness only through the injected RNG; given the
//! same seed and rule set it produces identical sequences. Analysis draws
//! no randomness at all and is idempotent over a given sequence.

mod analysis;
mod error;
mod stage;
mod stats;

pub use analysis::{AnalysisReport, RuleStats};
pub use error::{AnalysisError, StageError};
pub use stage::Stage;
pub use stats::binomial_test;
