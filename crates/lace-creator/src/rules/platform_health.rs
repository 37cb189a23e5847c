//! Gate on how long the platform has been unhealthy

use parking_lot::RwLock;
use std::time::Duration;

use super::EventCreationRule;
use crate::status::EventCreationStatus;

/// Permits creation while the reported unhealthy duration stays within bounds
pub struct PlatformHealthRule {
    max_unhealthy_duration: Duration,
    unhealthy_duration: RwLock<Duration>,
}

impl PlatformHealthRule {
    pub fn new(max_unhealthy_duration: Duration) -> Self {
        Self {
            max_unhealthy_duration,
            unhealthy_duration: RwLock::new(Duration::ZERO),
        }
    }

    /// Record how long the platform has currently been unhealthy (zero when healthy)
    pub fn report_unhealthy_duration(&self, duration: Duration) {
        *self.unhealthy_duration.write() = duration;
    }

    pub fn unhealthy_duration(&self) -> Duration {
        *self.unhealthy_duration.read()
    }
}

impl EventCreationRule for PlatformHealthRule {
    fn is_event_creation_permitted(&self) -> bool {
        self.unhealthy_duration() <= self.max_unhealthy_duration
    }

    fn status(&self) -> EventCreationStatus {
        EventCreationStatus::Overloaded
    }
}
