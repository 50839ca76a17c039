//! Error types for stage construction and analysis.

use thiserror::Error;

/// Errors raised when constructing a stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    /// The time-step granularity must be positive.
    #[error("time step must be positive, got {0}")]
    NonPositiveStep(f64),
}

/// Errors raised by sequence analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// An empty sequence has no last event to default the horizon to.
    #[error("cannot analyse an empty sequence without an explicit duration")]
    EmptySequence,

    /// The observed sequence must be non-decreasing by time.
    #[error("observed sequence is out of order at index {0}")]
    UnorderedSequence(usize),
}
