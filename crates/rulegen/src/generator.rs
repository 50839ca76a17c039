//! Random construction of timers, conditions and rules.

use crate::config::RuleGenConfig;
use rand::Rng;
use ruleflow_engine::{Condition, EngineError, PatternEntry, Rule, SequencePattern, Timer};
use ruleflow_types::NodeId;
use thiserror::Error;

/// Share of pattern slots that come out as wildcards.
const WILDCARD_SHARE: f64 = 0.2;

/// Errors raised by rule-population generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleGenError {
    /// The population must contain at least one rule.
    #[error("population must contain at least one rule")]
    NoRules,

    /// At least one node id is needed to draw senders and recipients.
    #[error("need at least one node id to draw from")]
    NoNodes,

    /// Time-condition thresholds are drawn from `(10, max_time - 10)`.
    #[error("horizon too short for time conditions: max_time = {0}, need > 20")]
    HorizonTooShort(f64),

    /// A drawn parameter set failed engine validation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Generate a random rule population.
///
/// Timers split evenly between fixed delays in `(5, 10)` and exponential
/// timers with rate in `(0.1, 2)` and a threshold comfortably above the
/// mean delay. Conditions nest aggregates down to a per-rule level and
/// bottom out in time comparisons or short sequence patterns; half of the
/// leaves get a probability override in `(0.2, 0.9)`.
pub fn generate_rules(
    config: &RuleGenConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Rule>, RuleGenError> {
    if config.num_rules == 0 {
        return Err(RuleGenError::NoRules);
    }
    if config.num_nodes == 0 {
        return Err(RuleGenError::NoNodes);
    }
    if config.max_time <= 20.0 {
        return Err(RuleGenError::HorizonTooShort(config.max_time));
    }

    let mut rules = Vec::with_capacity(config.num_rules);
    for index in 0..config.num_rules {
        let level = if config.uniform_levels {
            index % (config.max_aggregation_level + 1)
        } else {
            rng.gen_range(0..=config.max_aggregation_level)
        };

        let timer = random_timer(rng)?;
        let condition = random_condition(level, config, rng)?;
        let sender = NodeId(rng.gen_range(0..config.num_nodes));
        let recipient = NodeId(rng.gen_range(0..config.num_nodes));
        rules.push(Rule::new(sender, recipient, condition, timer));
    }
    Ok(rules)
}

fn random_timer(rng: &mut impl Rng) -> Result<Timer, RuleGenError> {
    let timer = if rng.gen() {
        Timer::fixed(round2(rng.gen_range(5.0..10.0)))?
    } else {
        let rate = round2(rng.gen_range(0.1..2.0));
        let threshold = round2(1.0 / rate + rng.gen_range(1.0..5.0));
        Timer::exponential(rate, threshold)?
    };
    Ok(timer)
}

fn random_condition(
    level: usize,
    config: &RuleGenConfig,
    rng: &mut impl Rng,
) -> Result<Condition, RuleGenError> {
    if level == 0 {
        return random_basic_condition(config, rng);
    }

    let left = random_condition(level - 1, config, rng)?;
    let right = if rng.gen() {
        random_condition(level - 1, config, rng)?
    } else {
        random_basic_condition(config, rng)?
    };

    Ok(if rng.gen() {
        Condition::all(left, right)
    } else {
        Condition::any(left, right)
    })
}

fn random_basic_condition(
    config: &RuleGenConfig,
    rng: &mut impl Rng,
) -> Result<Condition, RuleGenError> {
    let condition = if rng.gen() {
        random_time_condition(config, rng)?
    } else {
        random_sequence_condition(config, rng)?
    };

    if rng.gen() {
        Ok(condition)
    } else {
        let probability = round2(rng.gen_range(0.2..0.9));
        Ok(Condition::with_probability(condition, probability)?)
    }
}

fn random_time_condition(
    config: &RuleGenConfig,
    rng: &mut impl Rng,
) -> Result<Condition, RuleGenError> {
    let t1 = round2(rng.gen_range(10.0..config.max_time - 10.0));
    Ok(match rng.gen_range(0..3) {
        0 => Condition::before(t1),
        1 => Condition::after(t1),
        _ => {
            let span = rng.gen_range(5.0..(config.max_time / 10.0).max(6.0));
            let t2 = round2((t1 + span).min(config.max_time));
            Condition::between(t1, t2)?
        }
    })
}

fn random_sequence_condition(
    config: &RuleGenConfig,
    rng: &mut impl Rng,
) -> Result<Condition, RuleGenError> {
    let length = rng.gen_range(1..=3);
    let pattern = SequencePattern::new(
        random_pattern(config.num_nodes, length, rng),
        random_pattern(config.num_nodes, length, rng),
        (0..length).map(|_| round2(rng.gen_range(2.0..10.0))).collect(),
    )?;
    Ok(Condition::Sequence(pattern))
}

fn random_pattern(num_nodes: u32, length: usize, rng: &mut impl Rng) -> Vec<PatternEntry> {
    (0..length)
        .map(|_| {
            if rng.gen::<f64>() < WILDCARD_SHARE {
                PatternEntry::Any
            } else {
                PatternEntry::Node(NodeId(rng.gen_range(0..num_nodes)))
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
