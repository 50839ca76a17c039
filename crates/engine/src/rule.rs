//! Rules: a condition and a timer bound to a sender/recipient pair.

use crate::{Condition, Timer, TimerState, TriggerOutcome};
use rand::Rng;
use ruleflow_types::{ActivationId, Event, NodeId, Time};
use std::fmt;

/// An event-producing rule with immutable identity.
#[derive(Debug, Clone)]
pub struct Rule {
    sender: NodeId,
    recipient: NodeId,
    condition: Condition,
    timer: Timer,
}

/// Per-run mutable rule state: timer readiness plus the activation counter.
///
/// Owned by a single generation or analysis call and indexed by rule
/// position; a fresh state vector per run replaces explicit resets.
#[derive(Debug, Clone, Default)]
pub struct RuleState {
    /// Readiness state of the rule's timer.
    pub timer: TimerState,
    last_activation: u64,
}

impl RuleState {
    /// Forget all run-scoped state.
    ///
    /// Required between runs that share a state vector; equivalent to
    /// starting from `RuleState::default()`.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.last_activation = 0;
    }

    fn next_activation(&mut self) -> ActivationId {
        self.last_activation += 1;
        ActivationId(self.last_activation)
    }
}

impl Rule {
    /// Bind a condition and timer to a sender/recipient pair.
    pub fn new(sender: NodeId, recipient: NodeId, condition: Condition, timer: Timer) -> Self {
        Self {
            sender,
            recipient,
            condition,
            timer,
        }
    }

    /// Originating node of every event this rule produces.
    pub fn sender(&self) -> NodeId {
        self.sender
    }

    /// Receiving node of every event this rule produces.
    pub fn recipient(&self) -> NodeId {
        self.recipient
    }

    /// The rule's condition.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// The rule's timer.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Joint probability of firing given an opportunity.
    pub fn probability(&self) -> f64 {
        self.condition.probability() * self.timer.probability()
    }

    /// Stochastic firing attempt at `now`.
    ///
    /// Fires only if the condition holds on `(now, history)`, the timer is
    /// ready and its draw succeeds, and the condition-probability coin
    /// comes up. The timer's readiness window restarts on every accepted
    /// trigger, whether or not an event results. The produced event is
    /// stamped `now + delay`.
    pub fn produce_event(
        &self,
        state: &mut RuleState,
        now: Time,
        history: &[Event],
        rng: &mut impl Rng,
    ) -> Option<Event> {
        if !self.condition.evaluate(now, history) {
            return None;
        }
        let delay = match self.timer.trigger(&mut state.timer, now, rng) {
            TriggerOutcome::Delay(delay) => delay,
            TriggerOutcome::NotReady | TriggerOutcome::Rejected => return None,
        };
        // Weighted-condition probabilities are sampled here, after the
        // timer committed its readiness window.
        if rng.gen::<f64>() > self.condition.probability() {
            return None;
        }
        Some(Event::new(self.sender, self.recipient, now + delay))
    }

    /// Deterministic opportunity test used during analysis.
    ///
    /// Checks condition truth and timer readiness without drawing any
    /// random numbers. On success the timer's readiness window starts at
    /// `now` and a fresh activation id is issued.
    pub fn test_condition(
        &self,
        state: &mut RuleState,
        now: Time,
        history: &[Event],
    ) -> Option<ActivationId> {
        if self.condition.evaluate(now, history) && self.timer.is_ready(&state.timer, now) {
            self.timer.start(&mut state.timer, now);
            Some(state.next_activation())
        } else {
            None
        }
    }

    /// Earliest and latest event time a trigger at `now` could produce.
    pub fn timer_bounds(&self, now: Time) -> (Time, Time) {
        let (min, max) = self.timer.bounds();
        (now + min, now + max)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (p = {:.3})",
            self.sender,
            self.recipient,
            self.probability()
        )
    }
}
