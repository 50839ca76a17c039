//! Events and event sequences.

use crate::NodeId;
use std::fmt;

/// Simulation time, a non-negative real.
pub type Time = f64;

/// A single timestamped message from one node to another.
///
/// Immutable once emitted; sequences of events are ordered by `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// Originating node.
    pub sender: NodeId,
    /// Receiving node.
    pub recipient: NodeId,
    /// Emission time.
    pub time: Time,
}

impl Event {
    /// Create a new event.
    pub fn new(sender: NodeId, recipient: NodeId, time: Time) -> Self {
        Self {
            sender,
            recipient,
            time,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} @ {}", self.sender, self.recipient, self.time)
    }
}

/// An ordered list of events, non-decreasing by time (ties permitted).
pub type Sequence = Vec<Event>;

/// Check that a slice of events is non-decreasing by time.
pub fn is_time_ordered(events: &[Event]) -> bool {
    events.windows(2).all(|pair| pair[0].time <= pair[1].time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = Event::new(NodeId(0), NodeId(1), 2.5);
        assert_eq!(event.to_string(), "Node(0) -> Node(1) @ 2.5");
    }

    #[test]
    fn test_time_ordering() {
        let a = Event::new(NodeId(0), NodeId(1), 1.0);
        let b = Event::new(NodeId(1), NodeId(0), 1.0);
        let c = Event::new(NodeId(0), NodeId(1), 3.0);

        assert!(is_time_ordered(&[]));
        assert!(is_time_ordered(&[a]));
        assert!(is_time_ordered(&[a, b, c]), "ties are permitted");
        assert!(!is_time_ordered(&[c, a]));
    }
}
