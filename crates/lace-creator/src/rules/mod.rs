//! Gates in front of event creation
//!
//! Every rule answers one question: may an event be created right now? The
//! aggregate permits creation only when all of its rules do, and tells every
//! rule about each created event so timers stay correct even while some
//! other rule was the one blocking.

mod maximum_rate;
mod platform_health;
mod platform_status;
mod reconnect;

pub use maximum_rate::*;
pub use platform_health::*;
pub use platform_status::*;
pub use reconnect::*;

use std::sync::Arc;

use crate::status::EventCreationStatus;

/// A single condition event creation must satisfy
///
/// Rules are fed from other threads (status changes, health reports), so
/// they take `&self` and keep their state behind locks.
pub trait EventCreationRule: Send + Sync {
    /// True if this rule lets an event be created now
    fn is_event_creation_permitted(&self) -> bool;

    /// Called after every event created, whether or not this rule was blocking
    fn event_was_created(&self) {}

    /// Status to report when this rule denies creation
    fn status(&self) -> EventCreationStatus;
}

/// All-of composition of rules
#[derive(Clone, Default)]
pub struct AggregateEventCreationRules {
    rules: Vec<Arc<dyn EventCreationRule>>,
}

impl AggregateEventCreationRules {
    pub fn new(rules: Vec<Arc<dyn EventCreationRule>>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: Arc<dyn EventCreationRule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule that currently denies creation, if any
    pub fn first_denying(&self) -> Option<&Arc<dyn EventCreationRule>> {
        self.rules
            .iter()
            .find(|rule| !rule.is_event_creation_permitted())
    }
}

impl EventCreationRule for AggregateEventCreationRules {
    fn is_event_creation_permitted(&self) -> bool {
        self.first_denying().is_none()
    }

    fn event_was_created(&self) {
        for rule in &self.rules {
            rule.event_was_created();
        }
    }

    fn status(&self) -> EventCreationStatus {
        self.first_denying()
            .map_or(EventCreationStatus::Idle, |rule| rule.status())
    }
}
