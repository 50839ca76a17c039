//! The generate-analyse-aggregate experiment loop.

use crate::config::ExperimentConfig;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ruleflow_rulegen::{generate_rules, RuleGenError};
use ruleflow_simulation::{AnalysisError, Stage, StageError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by an experiment run.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Every generation attempt came back empty.
    #[error("no non-empty sequence after {0} generation attempts")]
    NoEvents(usize),

    /// Rule-population generation failed.
    #[error(transparent)]
    RuleGen(#[from] RuleGenError),

    /// Stage construction failed.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Sequence analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Aggregated outcome of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    /// Number of events in the analysed sequence.
    pub events: usize,

    /// Generation attempts used before a non-empty sequence appeared.
    pub attempts: usize,

    /// Fraction of events attributed to some rule.
    pub coverage: f64,

    /// Rules that accumulated at least one counted opportunity.
    pub rules_with_data: usize,

    /// Mean and standard deviation of `|true p - empirical rate|` over
    /// rules with data.
    pub abs_error_mean: f64,
    /// Spread of the absolute calibration error.
    pub abs_error_stddev: f64,

    /// Mean and standard deviation of binomial p-values over rules with
    /// data.
    pub p_value_mean: f64,
    /// Spread of the p-values.
    pub p_value_stddev: f64,
}

/// Run one calibration experiment.
///
/// Builds a seeded rule population, generates until a non-empty sequence
/// appears (an empty sequence is a valid outcome, so the loop simply
/// retries up to the configured limit), analyses it with the same stage,
/// and aggregates the per-rule statistics.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentReport, ExperimentError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let rules = generate_rules(&config.rulegen, &mut rng)?;
    let stage = Stage::new(rules, config.step)?;

    let mut attempts = 0;
    let sequence = loop {
        if attempts == config.max_attempts {
            return Err(ExperimentError::NoEvents(config.max_attempts));
        }
        attempts += 1;

        let sequence = stage.generate(config.duration, &mut rng);
        if !sequence.is_empty() {
            break sequence;
        }
        debug!(attempt = attempts, "empty sequence, regenerating");
    };

    let analysis = stage.analyse(&sequence, Some(config.duration))?;

    let mut abs_errors = Vec::new();
    let mut p_values = Vec::new();
    for (rule, stats) in stage.rules().iter().zip(&analysis.rules) {
        if let Some(stats) = stats {
            abs_errors.push((rule.probability() - stats.empirical_rate).abs());
            p_values.push(stats.p_value);
        }
    }

    let (abs_error_mean, abs_error_stddev) = mean_and_stddev(&abs_errors);
    let (p_value_mean, p_value_stddev) = mean_and_stddev(&p_values);

    let report = ExperimentReport {
        events: sequence.len(),
        attempts,
        coverage: analysis.coverage,
        rules_with_data: abs_errors.len(),
        abs_error_mean,
        abs_error_stddev,
        p_value_mean,
        p_value_stddev,
    };
    info!(
        events = report.events,
        coverage = report.coverage,
        rules_with_data = report.rules_with_data,
        abs_error_mean = report.abs_error_mean,
        "experiment complete"
    );
    Ok(report)
}

/// Population mean and standard deviation; `(0, 0)` for an empty slice.
fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    (mean, variance.sqrt())
}
