//! Core types shared across the ruleflow workspace.

mod event;
mod identifiers;

pub use event::{is_time_ordered, Event, Sequence, Time};
pub use identifiers::{ActivationId, NodeId};
