//! Boolean predicates over simulation time and event history.
//!
//! The variant set is closed: time comparison, sequence pattern match,
//! logical aggregate, and probability override. Every condition evaluates
//! deterministically; probabilities are reported, never sampled here.

use crate::error::EngineError;
use ruleflow_types::{Event, NodeId, Time};

/// Open-interval comparison against the current simulation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeWindow {
    /// True strictly before the given time.
    Less(Time),
    /// True strictly after the given time.
    More(Time),
    /// True strictly inside `(start, end)`; false at both endpoints.
    Between(Time, Time),
}

impl TimeWindow {
    fn contains(&self, now: Time) -> bool {
        match *self {
            TimeWindow::Less(t) => now < t,
            TimeWindow::More(t) => now > t,
            TimeWindow::Between(start, end) => start < now && now < end,
        }
    }
}

/// One slot of a sequence pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternEntry {
    /// Matches exactly one node.
    Node(NodeId),
    /// Wildcard, matches any node.
    Any,
}

impl PatternEntry {
    fn matches(&self, node: NodeId) -> bool {
        match *self {
            PatternEntry::Node(expected) => expected == node,
            PatternEntry::Any => true,
        }
    }
}

impl From<NodeId> for PatternEntry {
    fn from(node: NodeId) -> Self {
        PatternEntry::Node(node)
    }
}

impl From<u32> for PatternEntry {
    fn from(id: u32) -> Self {
        PatternEntry::Node(NodeId(id))
    }
}

/// Direction in which a [`SequencePattern`] walks the event history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOrder {
    /// Most recent event first (the production default).
    #[default]
    Reverse,
    /// Oldest event first; kept selectable for testing.
    Forward,
}

/// A pattern match over trailing event history.
///
/// Three equal-length arrays describe the expected senders, recipients and
/// inter-event gap budgets. Matching is a single-pass greedy automaton: a
/// match state `s` advances when the event under the cursor fits slot `s`
/// (gap budget and both node slots), resets to zero otherwise, and the
/// pattern succeeds the instant `s` reaches the pattern length. Overlapping
/// partial matches are not reconsidered once reset; there is no
/// backtracking.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePattern {
    senders: Vec<PatternEntry>,
    recipients: Vec<PatternEntry>,
    gaps: Vec<Time>,
    scan: ScanOrder,
}

impl SequencePattern {
    /// Build a pattern from its three arrays.
    ///
    /// Fails fast on zero length or a length mismatch; a malformed pattern
    /// never reaches evaluation.
    pub fn new(
        senders: Vec<PatternEntry>,
        recipients: Vec<PatternEntry>,
        gaps: Vec<Time>,
    ) -> Result<Self, EngineError> {
        if senders.len() != recipients.len() || senders.len() != gaps.len() {
            return Err(EngineError::PatternLengthMismatch {
                senders: senders.len(),
                recipients: recipients.len(),
                gaps: gaps.len(),
            });
        }
        if senders.is_empty() {
            return Err(EngineError::EmptyPattern);
        }
        Ok(Self {
            senders,
            recipients,
            gaps,
            scan: ScanOrder::default(),
        })
    }

    /// Switch to oldest-first scanning.
    pub fn with_forward_scan(mut self) -> Self {
        self.scan = ScanOrder::Forward;
        self
    }

    /// Number of slots in the pattern.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Always false: construction rejects empty patterns.
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Run the automaton over `history`. Empty history never matches.
    pub fn matches(&self, history: &[Event]) -> bool {
        match self.scan {
            ScanOrder::Reverse => self.run(history.iter().rev(), true),
            ScanOrder::Forward => self.run(history.iter(), false),
        }
    }

    fn run<'a>(&self, events: impl Iterator<Item = &'a Event>, reversed: bool) -> bool {
        let len = self.senders.len();
        // In reverse scans the pattern arrays are traversed back to front,
        // mirroring the event order.
        let slot = |state: usize| if reversed { len - 1 - state } else { state };

        let mut state = 0;
        let mut prev_time: Option<Time> = None;

        for event in events {
            let prev = *prev_time.get_or_insert(event.time);
            let index = slot(state);
            let gap_ok = state == 0 || (event.time - prev).abs() <= self.gaps[index];

            if gap_ok
                && self.senders[index].matches(event.sender)
                && self.recipients[index].matches(event.recipient)
            {
                state += 1;
            } else {
                state = 0;
            }
            prev_time = Some(event.time);

            if state == len {
                return true;
            }
        }
        false
    }
}

/// Logical combination operator for aggregate conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// Both children must hold.
    And,
    /// Either child must hold.
    Or,
}

/// A boolean predicate over `(current time, event history)`.
///
/// The comparison and logic operators are encoded in the type, so an
/// unrecognized operator is unrepresentable rather than a silent false.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Pure comparison against the current time.
    Time(TimeWindow),
    /// Pattern match over trailing history.
    Sequence(SequencePattern),
    /// Combination of two child conditions.
    Aggregate {
        /// Left child.
        left: Box<Condition>,
        /// Right child.
        right: Box<Condition>,
        /// How the two truth values combine.
        op: LogicOp,
    },
    /// Delegates evaluation to its child but reports an overridden
    /// probability. The override is consumed by the simulator and the
    /// statistical test; it is never sampled inside the condition.
    Weighted {
        /// Wrapped condition.
        inner: Box<Condition>,
        /// Reported success probability, in `(0, 1]`.
        probability: f64,
    },
}

impl Condition {
    /// True strictly before `t`.
    pub fn before(t: Time) -> Self {
        Condition::Time(TimeWindow::Less(t))
    }

    /// True strictly after `t`.
    pub fn after(t: Time) -> Self {
        Condition::Time(TimeWindow::More(t))
    }

    /// True strictly inside the open interval `(start, end)`.
    pub fn between(start: Time, end: Time) -> Result<Self, EngineError> {
        if start >= end {
            return Err(EngineError::EmptyTimeWindow { start, end });
        }
        Ok(Condition::Time(TimeWindow::Between(start, end)))
    }

    /// Conjunction of two conditions.
    pub fn all(left: Condition, right: Condition) -> Self {
        Condition::Aggregate {
            left: Box::new(left),
            right: Box::new(right),
            op: LogicOp::And,
        }
    }

    /// Disjunction of two conditions.
    pub fn any(left: Condition, right: Condition) -> Self {
        Condition::Aggregate {
            left: Box::new(left),
            right: Box::new(right),
            op: LogicOp::Or,
        }
    }

    /// Wrap a condition with a probability override.
    pub fn with_probability(inner: Condition, probability: f64) -> Result<Self, EngineError> {
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(EngineError::InvalidProbability(probability));
        }
        Ok(Condition::Weighted {
            inner: Box::new(inner),
            probability,
        })
    }

    /// Reported success probability.
    ///
    /// 1.0 for the deterministic variants, the product of both children
    /// for aggregates, the override for weighted conditions.
    pub fn probability(&self) -> f64 {
        match self {
            Condition::Time(_) | Condition::Sequence(_) => 1.0,
            Condition::Aggregate { left, right, .. } => left.probability() * right.probability(),
            Condition::Weighted { probability, .. } => *probability,
        }
    }

    /// Deterministic truth value on `(now, history)`.
    ///
    /// Aggregate children are both evaluated before combining; there is no
    /// short-circuit.
    pub fn evaluate(&self, now: Time, history: &[Event]) -> bool {
        match self {
            Condition::Time(window) => window.contains(now),
            Condition::Sequence(pattern) => pattern.matches(history),
            Condition::Aggregate { left, right, op } => {
                let lhs = left.evaluate(now, history);
                let rhs = right.evaluate(now, history);
                match op {
                    LogicOp::And => lhs && rhs,
                    LogicOp::Or => lhs || rhs,
                }
            }
            Condition::Weighted { inner, .. } => inner.evaluate(now, history),
        }
    }
}
