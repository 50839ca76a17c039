//! Error types for the rule engine.

use thiserror::Error;

/// Errors raised when constructing engine components.
///
/// All of these are build-time contract violations; evaluation itself is
/// infallible once a component has been constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A sequence pattern must have at least one slot.
    #[error("sequence pattern is empty")]
    EmptyPattern,

    /// The three pattern arrays must have equal length.
    #[error("sequence pattern length mismatch: {senders} senders, {recipients} recipients, {gaps} gap budgets")]
    PatternLengthMismatch {
        /// Sender pattern length.
        senders: usize,
        /// Recipient pattern length.
        recipients: usize,
        /// Gap-budget array length.
        gaps: usize,
    },

    /// A probability override must lie in `(0, 1]`.
    #[error("probability must be in (0, 1], got {0}")]
    InvalidProbability(f64),

    /// Timer parameters (delay, rate, threshold) must be positive.
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A `between` window must be a non-empty open interval.
    #[error("empty time window: start {start} is not before end {end}")]
    EmptyTimeWindow {
        /// Interval start.
        start: f64,
        /// Interval end.
        end: f64,
    },
}
