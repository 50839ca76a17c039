//! Rule evaluation engine.
//!
//! A [`Rule`] binds a [`Condition`] (a boolean predicate over simulation
//! time and event history) and a [`Timer`] (a fixed or stochastic delay
//! source with a retrigger timeout) to a fixed sender/recipient pair.
//!
//! Rules are immutable in identity. All run-scoped mutable state (timer
//! readiness, activation counters) lives in [`RuleState`] values owned by
//! the simulation call and indexed by rule position, so the same rule set
//! can be reused across runs without contamination.

mod condition;
mod error;
mod rule;
mod timer;

pub use condition::{Condition, LogicOp, PatternEntry, ScanOrder, SequencePattern, TimeWindow};
pub use error::EngineError;
pub use rule::{Rule, RuleState};
pub use timer::{Timer, TimerState, TriggerOutcome};
