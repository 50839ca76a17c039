//! Fixed and stochastic delay sources with retrigger readiness.

use crate::error::EngineError;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use ruleflow_types::Time;

/// Outcome of a trigger attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    /// The timer produced a delay.
    Delay(Time),
    /// The retrigger timeout has not elapsed; nothing happened.
    NotReady,
    /// The timer was ready but the sampled delay exceeded its threshold.
    ///
    /// Distinct from [`TriggerOutcome::NotReady`]: the readiness window
    /// restarted and the attempt still counts as a tested opportunity.
    Rejected,
}

impl TriggerOutcome {
    /// The produced delay, if any.
    pub fn delay(self) -> Option<Time> {
        match self {
            TriggerOutcome::Delay(delay) => Some(delay),
            TriggerOutcome::NotReady | TriggerOutcome::Rejected => None,
        }
    }
}

/// Per-run mutable timer state, owned by the simulation call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimerState {
    started_at: Option<Time>,
}

impl TimerState {
    /// When the readiness timeout last started, if ever.
    pub fn started_at(&self) -> Option<Time> {
        self.started_at
    }

    /// Clear the readiness timeout, making the timer immediately ready.
    pub fn reset(&mut self) {
        self.started_at = None;
    }
}

/// A delay source bound to a rule.
///
/// The timer itself is immutable configuration; readiness lives in
/// [`TimerState`].
#[derive(Debug, Clone, PartialEq)]
pub enum Timer {
    /// Always yields the same delay.
    Deterministic {
        /// The fixed delay, also the retrigger timeout.
        delay: Time,
    },
    /// Draws from `Exp(rate)`, succeeding only when the draw stays at or
    /// under `threshold`.
    Exponential {
        /// Rate parameter of the exponential distribution.
        rate: f64,
        /// Success threshold, also the retrigger timeout.
        threshold: Time,
    },
}

impl Timer {
    /// A timer with a fixed positive delay.
    pub fn fixed(delay: Time) -> Result<Self, EngineError> {
        if delay <= 0.0 {
            return Err(EngineError::NonPositiveParameter {
                name: "delay",
                value: delay,
            });
        }
        Ok(Timer::Deterministic { delay })
    }

    /// An exponential timer with the given rate and success threshold.
    pub fn exponential(rate: f64, threshold: Time) -> Result<Self, EngineError> {
        if rate <= 0.0 {
            return Err(EngineError::NonPositiveParameter {
                name: "rate",
                value: rate,
            });
        }
        if threshold <= 0.0 {
            return Err(EngineError::NonPositiveParameter {
                name: "threshold",
                value: threshold,
            });
        }
        Ok(Timer::Exponential { rate, threshold })
    }

    /// Probability that a ready trigger produces a delay.
    pub fn probability(&self) -> f64 {
        match *self {
            Timer::Deterministic { .. } => 1.0,
            Timer::Exponential { rate, threshold } => 1.0 - (-rate * threshold).exp(),
        }
    }

    /// Numeric bounds `(min, max)` of the delays this timer can produce.
    pub fn bounds(&self) -> (Time, Time) {
        match *self {
            Timer::Deterministic { delay } => (delay, delay),
            Timer::Exponential { threshold, .. } => (0.0, threshold),
        }
    }

    /// Minimum gap between successive trigger starts.
    pub fn ready_timeout(&self) -> Time {
        match *self {
            Timer::Deterministic { delay } => delay,
            Timer::Exponential { threshold, .. } => threshold,
        }
    }

    /// Whether a trigger at `now` would be accepted.
    ///
    /// True if the timer never started, or if the readiness timeout has
    /// fully elapsed since the last start.
    pub fn is_ready(&self, state: &TimerState, now: Time) -> bool {
        match state.started_at {
            None => true,
            Some(started_at) => now - started_at >= self.ready_timeout(),
        }
    }

    /// Begin the readiness timeout at `now` without sampling a delay.
    ///
    /// Used by the deterministic opportunity test during analysis.
    pub fn start(&self, state: &mut TimerState, now: Time) {
        state.started_at = Some(now);
    }

    /// Attempt to produce a delay at `now`.
    ///
    /// A not-ready timer is left untouched. A ready timer restarts its
    /// readiness window first, regardless of the draw outcome.
    pub fn trigger(
        &self,
        state: &mut TimerState,
        now: Time,
        rng: &mut impl Rng,
    ) -> TriggerOutcome {
        if !self.is_ready(state, now) {
            return TriggerOutcome::NotReady;
        }
        state.started_at = Some(now);

        match *self {
            Timer::Deterministic { delay } => TriggerOutcome::Delay(delay),
            Timer::Exponential { rate, threshold } => {
                // Rate is validated positive at construction.
                let exp = Exp::new(rate).expect("exponential rate must be positive");
                let draw = exp.sample(rng);
                if draw <= threshold {
                    TriggerOutcome::Delay(draw)
                } else {
                    TriggerOutcome::Rejected
                }
            }
        }
    }
}
