//! Attribution bookkeeping: expected-event windows, candidate labels, and
//! the greedy disambiguation pass.

use ruleflow_types::{ActivationId, Time};

/// The time interval in which an activation's event could plausibly appear.
///
/// Derived by adding a timer's delay bounds to the instant the owning
/// rule's condition was deterministically confirmed true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ExpectedWindow {
    /// Index of the owning rule.
    pub rule: usize,
    /// Opportunity instance within that rule.
    pub activation: ActivationId,
    /// Earliest possible event time.
    pub start: Time,
    /// Latest possible event time.
    pub end: Time,
}

impl ExpectedWindow {
    /// Whether the window still brackets `t`.
    pub fn covers(&self, t: Time) -> bool {
        self.start <= t && t <= self.end
    }

    /// Whether the window lies entirely in the past of `now`.
    pub fn expired(&self, now: Time) -> bool {
        self.end < now
    }
}

/// One candidate label for an observed event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    /// Index of the candidate rule.
    pub rule: usize,
    /// The specific activation whose window covered the event.
    pub activation: ActivationId,
    /// The rule's joint probability, used to rank ambiguous labels.
    pub probability: f64,
}

/// Per-rule outcome of the calibration test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleStats {
    /// Observed firing rate: attributed events over counted opportunities.
    pub empirical_rate: f64,
    /// Two-sided exact binomial p-value against the rule's theoretical
    /// probability.
    pub p_value: f64,
}

/// Result of [`Stage::analyse`](crate::Stage::analyse).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Fraction of observed events attributed to some rule.
    pub coverage: f64,
    /// Per-rule statistics, `None` where a rule had no counted
    /// opportunities.
    pub rules: Vec<Option<RuleStats>>,
}

/// Resolve the many-to-many candidate graph into a one-to-one assignment.
///
/// Repeatedly: assign any event with exactly one live candidate to that
/// activation; otherwise decide the ambiguous event whose two
/// highest-probability candidates are furthest apart, in favour of the
/// higher one. Each activation is consumed at most once. Events whose
/// candidates are all consumed elsewhere end unlabeled.
///
/// This is a greedy maximum-confidence heuristic, not an optimal bipartite
/// assignment. All tie-breaks are positional, so the result is
/// deterministic for a given input.
pub(crate) fn resolve_candidates(mut candidates: Vec<Vec<Candidate>>) -> Vec<Option<usize>> {
    let count = candidates.len();
    let mut assigned: Vec<Option<usize>> = vec![None; count];
    let mut resolved = vec![false; count];
    let mut consumed: Vec<(usize, ActivationId)> = Vec::new();

    loop {
        for (index, labels) in candidates.iter_mut().enumerate() {
            if !resolved[index] {
                labels.retain(|c| !consumed.contains(&(c.rule, c.activation)));
            }
        }

        // Forced assignments first.
        if let Some(index) = (0..count).find(|&i| !resolved[i] && candidates[i].len() == 1) {
            let label = candidates[index][0];
            consumed.push((label.rule, label.activation));
            assigned[index] = Some(label.rule);
            resolved[index] = true;
            continue;
        }

        // Then the most confidently decidable ambiguous event: largest gap
        // between its two best candidates. First such event wins ties.
        let mut best: Option<(usize, f64)> = None;
        for (index, labels) in candidates.iter().enumerate() {
            if resolved[index] || labels.len() < 2 {
                continue;
            }
            let (top, runner_up) = top_two(labels);
            let gap = top - runner_up;
            if best.map_or(true, |(_, widest)| gap > widest) {
                best = Some((index, gap));
            }
        }

        let Some((index, _)) = best else {
            break;
        };
        // Highest-probability candidate wins; the earliest one on a tie.
        let mut winner = candidates[index][0];
        for label in &candidates[index][1..] {
            if label.probability > winner.probability {
                winner = *label;
            }
        }
        consumed.push((winner.rule, winner.activation));
        assigned[index] = Some(winner.rule);
        resolved[index] = true;
    }

    assigned
}

fn top_two(labels: &[Candidate]) -> (f64, f64) {
    let mut top = f64::NEG_INFINITY;
    let mut runner_up = f64::NEG_INFINITY;
    for label in labels {
        if label.probability > top {
            runner_up = top;
            top = label.probability;
        } else if label.probability > runner_up {
            runner_up = label.probability;
        }
    }
    (top, runner_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rule: usize, activation: u64, probability: f64) -> Candidate {
        Candidate {
            rule,
            activation: ActivationId(activation),
            probability,
        }
    }

    #[test]
    fn test_window_cover_and_expiry() {
        let window = ExpectedWindow {
            rule: 0,
            activation: ActivationId(1),
            start: 2.0,
            end: 5.0,
        };
        assert!(window.covers(2.0));
        assert!(window.covers(5.0));
        assert!(!window.covers(5.1));
        assert!(!window.expired(5.0));
        assert!(window.expired(5.1));
    }

    #[test]
    fn test_singletons_are_assigned_first() {
        // Event 0 is ambiguous, event 1 is forced to rule 2's activation.
        // Settling event 1 first consumes that activation and forces
        // event 0 onto rule 1.
        let candidates = vec![
            vec![candidate(1, 1, 0.4), candidate(2, 7, 0.9)],
            vec![candidate(2, 7, 0.9)],
        ];
        let assigned = resolve_candidates(candidates);
        assert_eq!(assigned, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_widest_probability_gap_decided_first() {
        // Event 0's gap is 0.1, event 1's is 0.6; event 1 is decided first
        // and takes rule 3's activation, leaving event 0 forced to rule 1.
        let candidates = vec![
            vec![candidate(1, 1, 0.5), candidate(3, 2, 0.6)],
            vec![candidate(2, 1, 0.1), candidate(3, 2, 0.7)],
        ];
        let assigned = resolve_candidates(candidates);
        assert_eq!(assigned, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_unmatchable_event_stays_unlabeled() {
        let candidates = vec![vec![], vec![candidate(0, 1, 0.5)]];
        let assigned = resolve_candidates(candidates);
        assert_eq!(assigned, vec![None, Some(0)]);
    }

    #[test]
    fn test_consumed_activation_cannot_label_twice() {
        // Both events point at the same activation; only one gets it.
        let candidates = vec![vec![candidate(0, 1, 0.8)], vec![candidate(0, 1, 0.8)]];
        let assigned = resolve_candidates(candidates);
        assert_eq!(assigned, vec![Some(0), None]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let candidates = vec![
            vec![candidate(0, 1, 0.5), candidate(1, 1, 0.5)],
            vec![candidate(0, 2, 0.5), candidate(1, 1, 0.5)],
        ];
        let first = resolve_candidates(candidates.clone());
        let second = resolve_candidates(candidates);
        assert_eq!(first, second);
    }
}
