//! The stage: an ordered rule collection driving generation and analysis.

use crate::analysis::{resolve_candidates, AnalysisReport, Candidate, ExpectedWindow, RuleStats};
use crate::error::{AnalysisError, StageError};
use crate::stats::binomial_test;
use rand::Rng;
use ruleflow_engine::{Rule, RuleState};
use ruleflow_types::{Event, Sequence, Time};
use tracing::{debug, trace};

/// An ordered rule collection with a time-step granularity.
///
/// Rule order matters only for tie-breaking determinism during
/// generation, not for correctness. The stage owns no event data; both
/// entry points allocate fresh per-rule state, so repeated or interleaved
/// calls never contaminate each other.
#[derive(Debug, Clone)]
pub struct Stage {
    rules: Vec<Rule>,
    step: Time,
}

impl Stage {
    /// Create a stage over `rules` with the given step granularity.
    pub fn new(rules: Vec<Rule>, step: Time) -> Result<Self, StageError> {
        if step <= 0.0 {
            return Err(StageError::NonPositiveStep(step));
        }
        Ok(Self { rules, step })
    }

    /// The rules, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The time-step granularity.
    pub fn step(&self) -> Time {
        self.step
    }

    /// Generate an event sequence over `[0, duration)`.
    ///
    /// Time advances to the earlier of the next step boundary and the
    /// earliest pending event, so fine-grained event times are never
    /// rounded away and committed events are always in order. Rules see
    /// committed history only; an event cannot be reacted to in the tick
    /// that produces it.
    ///
    /// An empty result is a valid outcome, not an error; callers
    /// regenerate or accept it.
    pub fn generate(&self, duration: Time, rng: &mut impl Rng) -> Sequence {
        let mut states = vec![RuleState::default(); self.rules.len()];
        let mut committed: Sequence = Vec::new();
        // Events produced but not yet time-eligible to commit.
        let mut pending: Vec<(usize, Event)> = Vec::new();
        let mut now: Time = 0.0;

        while now < duration {
            Self::commit_due(&mut pending, &mut committed, now);

            for (index, rule) in self.rules.iter().enumerate() {
                if let Some(event) = rule.produce_event(&mut states[index], now, &committed, rng)
                {
                    trace!(rule = index, time = event.time, "rule fired");
                    pending.push((index, event));
                }
            }

            let mut next = now + self.step;
            if let Some(earliest) = pending
                .iter()
                .map(|(_, event)| event.time)
                .filter(|&time| time > now)
                .min_by(|a, b| a.total_cmp(b))
            {
                next = next.min(earliest);
            }
            now = next;
        }

        debug!(
            events = committed.len(),
            duration, "generation run complete"
        );
        committed
    }

    /// Move every pending event due at `now` into the committed sequence,
    /// ascending by time with ties broken by rule evaluation order.
    fn commit_due(pending: &mut Vec<(usize, Event)>, committed: &mut Sequence, now: Time) {
        if pending.is_empty() {
            return;
        }
        let mut due: Vec<(usize, Event)> = Vec::new();
        pending.retain(|&(index, event)| {
            if event.time <= now {
                due.push((index, event));
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.1.time.total_cmp(&b.1.time).then(a.0.cmp(&b.0)));
        committed.extend(due.into_iter().map(|(_, event)| event));
    }

    /// Attribute each observed event to the rule most plausibly behind it
    /// and test every rule's empirical firing rate against its theoretical
    /// probability.
    ///
    /// The horizon defaults to the last event's time when omitted;
    /// analysing an empty sequence without an explicit horizon fails. The
    /// sweep is fully deterministic: only condition truth and timer
    /// readiness are consulted, never randomness.
    pub fn analyse(
        &self,
        sequence: &[Event],
        duration: Option<Time>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let duration = match duration {
            Some(duration) => duration,
            None => {
                sequence
                    .last()
                    .map(|event| event.time)
                    .ok_or(AnalysisError::EmptySequence)?
            }
        };
        if let Some(index) = sequence
            .windows(2)
            .position(|pair| pair[0].time > pair[1].time)
        {
            return Err(AnalysisError::UnorderedSequence(index + 1));
        }

        let mut states = vec![RuleState::default(); self.rules.len()];
        let mut opportunities = vec![0u64; self.rules.len()];
        let mut open: Vec<ExpectedWindow> = Vec::new();
        let mut candidates: Vec<Vec<Candidate>> = vec![Vec::new(); sequence.len()];

        let mut now: Time = 0.0;
        // Events at or before the sweep instant; doubles as the history
        // prefix boundary.
        let mut prefix_len = 0usize;
        // Events already matched against open windows.
        let mut matched = 0usize;

        // The sweep visits every step boundary and every event timestamp
        // up to and including the horizon.
        while now <= duration {
            while prefix_len < sequence.len() && sequence[prefix_len].time <= now {
                prefix_len += 1;
            }
            let history = &sequence[..prefix_len];

            open.retain(|window| !window.expired(now));

            // Match the events occurring at this instant against windows
            // opened strictly earlier. A window opened at this very
            // instant cannot claim an event that is already here.
            while matched < prefix_len {
                let event = sequence[matched];
                for window in &open {
                    let rule = &self.rules[window.rule];
                    if window.covers(event.time)
                        && rule.sender() == event.sender
                        && rule.recipient() == event.recipient
                    {
                        candidates[matched].push(Candidate {
                            rule: window.rule,
                            activation: window.activation,
                            probability: rule.probability(),
                        });
                    }
                }
                trace!(
                    event = matched,
                    time = event.time,
                    labels = candidates[matched].len(),
                    "candidate labels collected"
                );
                matched += 1;
            }

            // Deterministic opportunity sweep at this instant.
            for (index, rule) in self.rules.iter().enumerate() {
                if let Some(activation) = rule.test_condition(&mut states[index], now, history) {
                    let (start, end) = rule.timer_bounds(now);
                    // Windows reaching past the horizon have unobservable
                    // outcomes: they match but do not count as trials.
                    if end <= duration {
                        opportunities[index] += 1;
                    }
                    open.push(ExpectedWindow {
                        rule: index,
                        activation,
                        start,
                        end,
                    });
                }
            }

            let mut next = now + self.step;
            if prefix_len < sequence.len() {
                next = next.min(sequence[prefix_len].time);
            }
            now = next;
        }

        let assigned = resolve_candidates(candidates);

        let mut assigned_counts = vec![0u64; self.rules.len()];
        let mut labeled = 0usize;
        for rule in assigned.iter().flatten() {
            assigned_counts[*rule] += 1;
            labeled += 1;
        }

        let coverage = if sequence.is_empty() {
            1.0
        } else {
            labeled as f64 / sequence.len() as f64
        };

        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let trials = opportunities[index];
                if trials == 0 {
                    return None;
                }
                let hits = assigned_counts[index].min(trials);
                Some(RuleStats {
                    empirical_rate: hits as f64 / trials as f64,
                    p_value: binomial_test(hits, trials, rule.probability()),
                })
            })
            .collect();

        debug!(
            events = sequence.len(),
            labeled, coverage, "analysis run complete"
        );
        Ok(AnalysisReport { coverage, rules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use ruleflow_engine::{Condition, SequencePattern, Timer};
    use ruleflow_types::{is_time_ordered, NodeId};

    fn rule(sender: u32, recipient: u32, condition: Condition, timer: Timer) -> Rule {
        Rule::new(NodeId(sender), NodeId(recipient), condition, timer)
    }

    fn event(sender: u32, recipient: u32, time: Time) -> Event {
        Event::new(NodeId(sender), NodeId(recipient), time)
    }

    #[test]
    fn test_stage_rejects_non_positive_step() {
        assert_eq!(
            Stage::new(vec![], 0.0).unwrap_err(),
            StageError::NonPositiveStep(0.0)
        );
    }

    #[test]
    fn test_generate_ordered_and_bounded() {
        let rules = vec![
            rule(0, 1, Condition::after(3.0), Timer::fixed(1.5).unwrap()),
            rule(
                1,
                0,
                Condition::after(0.0),
                Timer::exponential(0.8, 4.0).unwrap(),
            ),
        ];
        let stage = Stage::new(rules, 1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for duration in [5.0, 20.0, 50.0] {
            let sequence = stage.generate(duration, &mut rng);
            assert!(is_time_ordered(&sequence));
            assert!(sequence.iter().all(|event| event.time < duration));
        }
    }

    #[test]
    fn test_generate_with_no_eligible_rule_is_empty() {
        let rules = vec![rule(0, 1, Condition::after(100.0), Timer::fixed(1.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(stage.generate(50.0, &mut rng).is_empty());
    }

    #[test]
    fn test_deterministic_rule_fires_on_schedule() {
        // The spec scenario: after time 10 with fixed delay 2, the first
        // event cannot appear before time 12.
        let rules = vec![rule(0, 1, Condition::after(10.0), Timer::fixed(2.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let sequence = stage.generate(20.0, &mut rng);
        assert!(!sequence.is_empty());
        assert!(sequence[0].time >= 12.0);
        // Fixed delay 2 doubles as the retrigger timeout: one event every
        // two time units from time 13 (first tick past 10 is 11).
        assert_eq!(sequence[0].time, 13.0);
        assert!(sequence
            .windows(2)
            .all(|pair| pair[1].time - pair[0].time >= 2.0));
    }

    #[test]
    fn test_chained_rules_see_committed_history_only() {
        // Rule B reacts to two prior 0->1 events within 5-unit gaps.
        let pattern = SequencePattern::new(
            vec![0.into(), 0.into()],
            vec![1.into(), 1.into()],
            vec![5.0, 5.0],
        )
        .unwrap();
        let rules = vec![
            rule(0, 1, Condition::after(10.0), Timer::fixed(2.0).unwrap()),
            rule(
                0,
                1,
                Condition::Sequence(pattern),
                Timer::exponential(3.0, 1.0).unwrap(),
            ),
        ];
        let stage = Stage::new(rules, 1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let sequence = stage.generate(20.0, &mut rng);
        assert!(is_time_ordered(&sequence));
        assert!(!sequence.is_empty());
        // Nothing can fire before the time gate opens plus the delay.
        assert!(sequence[0].time >= 12.0);
        // Rule B needs two committed events no further than 5 apart, which
        // first exists at time 15; its events cannot predate that.
        for pair in sequence.windows(2) {
            assert!(pair[1].time - pair[0].time > 0.0 || pair[0].time >= 15.0);
        }
    }

    #[test]
    fn test_analyse_empty_sequence_requires_duration() {
        let stage = Stage::new(vec![], 1.0).unwrap();
        assert_eq!(
            stage.analyse(&[], None).unwrap_err(),
            AnalysisError::EmptySequence
        );

        let report = stage.analyse(&[], Some(10.0)).unwrap();
        assert_eq!(report.coverage, 1.0);
        assert!(report.rules.is_empty());
    }

    #[test]
    fn test_analyse_rejects_unordered_input() {
        let stage = Stage::new(vec![], 1.0).unwrap();
        let sequence = vec![event(0, 1, 5.0), event(0, 1, 3.0)];
        assert_eq!(
            stage.analyse(&sequence, Some(10.0)).unwrap_err(),
            AnalysisError::UnorderedSequence(1)
        );
    }

    #[test]
    fn test_analyse_counts_opportunities_without_events() {
        // Condition always true, fixed delay 2, horizon 10: opportunities
        // at t = 0, 2, 4, 6, 8 land inside the horizon; the test at t = 10
        // opens a window ending past it.
        let rules = vec![rule(0, 1, Condition::after(-1.0), Timer::fixed(2.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();

        let report = stage.analyse(&[], Some(10.0)).unwrap();
        let stats = report.rules[0].expect("rule had opportunities");
        assert_eq!(stats.empirical_rate, 0.0);
        // Five trials, zero hits, against probability 1.0.
        assert_eq!(stats.p_value, 0.0);
    }

    #[test]
    fn test_analyse_matches_unique_candidate() {
        let rules = vec![rule(0, 1, Condition::after(-1.0), Timer::fixed(2.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();

        // Events exactly where the deterministic windows land.
        let sequence = vec![event(0, 1, 2.0), event(0, 1, 4.0)];
        let report = stage.analyse(&sequence, Some(5.0)).unwrap();

        assert_eq!(report.coverage, 1.0);
        let stats = report.rules[0].unwrap();
        // Opportunities at t = 0 and t = 2 land inside the horizon; the
        // one at t = 4 opens a window past it and is not a trial.
        assert_eq!(stats.empirical_rate, 1.0);
        assert!(stats.p_value > 0.99);
    }

    #[test]
    fn test_analyse_wrong_pair_yields_no_label() {
        let rules = vec![rule(0, 1, Condition::after(-1.0), Timer::fixed(2.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();

        // Right times, wrong direction.
        let sequence = vec![event(1, 0, 2.0), event(1, 0, 4.0)];
        let report = stage.analyse(&sequence, Some(5.0)).unwrap();

        assert_eq!(report.coverage, 0.0);
        let stats = report.rules[0].unwrap();
        assert_eq!(stats.empirical_rate, 0.0);
    }

    #[test]
    fn test_ambiguous_event_goes_to_higher_probability_rule() {
        // Two rules produce identical windows for the same pair; the
        // greedy pass hands the lone event to the likelier rule.
        let certain = rule(0, 1, Condition::after(-1.0), Timer::fixed(5.0).unwrap());
        let unlikely = rule(
            0,
            1,
            Condition::with_probability(Condition::after(-1.0), 0.3).unwrap(),
            Timer::fixed(5.0).unwrap(),
        );
        let stage = Stage::new(vec![certain, unlikely], 1.0).unwrap();

        let sequence = vec![event(0, 1, 5.0)];
        let report = stage.analyse(&sequence, Some(6.0)).unwrap();

        assert_eq!(report.coverage, 1.0);
        let winner = report.rules[0].unwrap();
        let loser = report.rules[1].unwrap();
        assert_eq!(winner.empirical_rate, 1.0);
        assert_eq!(loser.empirical_rate, 0.0);
        // Zero hits is the modal outcome under probability 0.3 with one
        // trial, so the two-sided test sums every point mass.
        assert!(loser.p_value > 0.99);
    }

    #[test]
    fn test_analyse_is_idempotent() {
        let rules = vec![
            rule(0, 1, Condition::after(10.0), Timer::fixed(2.0).unwrap()),
            rule(
                1,
                0,
                Condition::after(0.0),
                Timer::exponential(0.5, 3.0).unwrap(),
            ),
        ];
        let stage = Stage::new(rules, 1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let sequence = stage.generate(60.0, &mut rng);
        assert!(!sequence.is_empty());

        let first = stage.analyse(&sequence, Some(60.0)).unwrap();
        let second = stage.analyse(&sequence, Some(60.0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyse_defaults_duration_to_last_event() {
        let rules = vec![rule(0, 1, Condition::after(-1.0), Timer::fixed(2.0).unwrap())];
        let stage = Stage::new(rules, 1.0).unwrap();

        let sequence = vec![event(0, 1, 2.0), event(0, 1, 4.0)];
        let defaulted = stage.analyse(&sequence, None).unwrap();
        let explicit = stage.analyse(&sequence, Some(4.0)).unwrap();
        assert_eq!(defaulted, explicit);
    }
}
