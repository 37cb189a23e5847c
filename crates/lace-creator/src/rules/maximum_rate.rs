//! Upper bound on the event creation rate

use chrono::{DateTime, Duration, Utc};
use lace_core::clock::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

use super::EventCreationRule;
use crate::status::EventCreationStatus;

/// Permits creation once `1 / max_rate` seconds have passed since the last event
pub struct MaximumRateRule {
    clock: Arc<dyn Clock>,

    /// None when the rate is unlimited
    min_period: Option<Duration>,

    last_creation: Mutex<Option<DateTime<Utc>>>,
}

impl MaximumRateRule {
    /// Create a rule for `max_rate` events per second; zero or less is unlimited
    pub fn new(max_rate: f64, clock: Arc<dyn Clock>) -> Self {
        let min_period = (max_rate > 0.0).then(|| {
            let nanos = (1_000_000_000.0 / max_rate).round().max(1.0);
            Duration::nanoseconds(nanos.min(i64::MAX as f64) as i64)
        });
        Self {
            clock,
            min_period,
            last_creation: Mutex::new(None),
        }
    }

    pub fn min_period(&self) -> Option<Duration> {
        self.min_period
    }
}

impl EventCreationRule for MaximumRateRule {
    fn is_event_creation_permitted(&self) -> bool {
        let Some(min_period) = self.min_period else {
            return true;
        };
        match *self.last_creation.lock() {
            Some(last) => self.clock.now() - last >= min_period,
            None => true,
        }
    }

    fn event_was_created(&self) {
        *self.last_creation.lock() = Some(self.clock.now());
    }

    fn status(&self) -> EventCreationStatus {
        EventCreationStatus::RateLimited
    }
}
