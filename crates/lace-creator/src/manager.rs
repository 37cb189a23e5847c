//! # Event Creation Manager
//!
//! Puts the creation rules in front of an [`EventCreator`] and serializes
//! every access to it.
//!
//! Creation ticks and gossip intake run on different threads. The creator's
//! trackers must change atomically with respect to each other, so all calls
//! go through one lock. The creation path only waits a bounded time for it:
//! a tick that cannot get the lock quickly is skipped, the next one retries.

use hashbrown::HashMap;
use lace_core::clock::Clock;
use lace_core::event::GossipEvent;
use lace_core::types::{EventWindow, NodeId};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EventCreationConfig;
use crate::creator::{EventCreator, TipsetEventCreator};
use crate::error::CreationResult;
use crate::rules::{
    AggregateEventCreationRules, EventCreationRule, MaximumRateRule, PlatformHealthRule,
    PlatformStatusRule, ReconnectStateSavedRule,
};
use crate::signer::TransactionSupplier;
use crate::status::{CreationStats, EventCreationStatus, PlatformStatus};

/// Rule-gated, thread-safe front of an event creator
pub struct EventCreationManager<C: EventCreator = TipsetEventCreator> {
    creator: Mutex<C>,
    lock_timeout: Duration,

    rules: AggregateEventCreationRules,
    platform_status: Arc<PlatformStatusRule>,
    health: Arc<PlatformHealthRule>,
    reconnect: Arc<ReconnectStateSavedRule>,

    status: RwLock<EventCreationStatus>,
    stats: RwLock<CreationStats>,
}

impl<C: EventCreator> EventCreationManager<C> {
    /// Wrap `creator` with the standard rules built from `config`
    pub fn new(
        creator: C,
        config: &EventCreationConfig,
        clock: Arc<dyn Clock>,
        transactions: Arc<dyn TransactionSupplier>,
    ) -> Self {
        let platform_status = Arc::new(PlatformStatusRule::new(transactions));
        let health = Arc::new(PlatformHealthRule::new(config.max_unhealthy_duration()));
        let reconnect = Arc::new(ReconnectStateSavedRule::new());
        let rate = Arc::new(MaximumRateRule::new(config.max_creation_rate, clock));

        let rules = AggregateEventCreationRules::new(vec![
            platform_status.clone() as Arc<dyn EventCreationRule>,
            health.clone(),
            reconnect.clone(),
            rate,
        ]);

        Self {
            creator: Mutex::new(creator),
            lock_timeout: config.creator_lock_timeout(),
            rules,
            platform_status,
            health,
            reconnect,
            status: RwLock::new(EventCreationStatus::Idle),
            stats: RwLock::new(CreationStats::default()),
        }
    }

    /// Add a rule on top of the standard ones
    pub fn with_rule(mut self, rule: Arc<dyn EventCreationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Create an event if every rule permits it and the creator finds parents
    ///
    /// Returns `Ok(None)` when no event is created for any ordinary reason;
    /// the reason is available from [`status`](Self::status). Signing faults
    /// are returned as errors.
    pub fn maybe_create_event(&self) -> CreationResult<Option<GossipEvent>> {
        self.stats.write().attempts += 1;

        if let Some(rule) = self.rules.first_denying() {
            self.set_status(rule.status());
            self.stats.write().denied_by_rules += 1;
            return Ok(None);
        }

        let Some(mut creator) = self.creator.try_lock_for(self.lock_timeout) else {
            debug!("Event creator busy, skipping creation attempt");
            self.stats.write().lock_contended += 1;
            return Ok(None);
        };

        self.set_status(EventCreationStatus::AttemptingCreation);
        let created = match creator.maybe_create_event() {
            Ok(created) => created,
            Err(e) => {
                self.set_status(EventCreationStatus::Idle);
                return Err(e);
            }
        };
        match created {
            Some(event) => {
                self.rules.event_was_created();
                self.stats.write().created += 1;
                self.set_status(EventCreationStatus::Idle);
                Ok(Some(event))
            }
            None => {
                self.stats.write().declined += 1;
                self.set_status(EventCreationStatus::NoEligibleParents);
                Ok(None)
            }
        }
    }

    pub fn register_event(&self, event: &GossipEvent) {
        self.creator.lock().register_event(event);
    }

    pub fn set_event_window(&self, window: EventWindow) {
        self.creator.lock().set_event_window(window);
    }

    /// Forget the creator's state, as after a reconnect
    pub fn clear(&self) {
        self.creator.lock().clear();
        self.set_status(EventCreationStatus::Idle);
    }

    /// Rebuild the creator's view from a loaded state
    ///
    /// Only the newest event of each creator is registered; its ancestors are
    /// not needed to pick parents.
    pub fn load_events(&self, window: EventWindow, events: &[GossipEvent]) {
        let mut latest: HashMap<NodeId, &GossipEvent> = HashMap::new();
        for event in events {
            latest
                .entry(event.creator())
                .and_modify(|current| {
                    if event.generation() > current.generation() {
                        *current = event;
                    }
                })
                .or_insert(event);
        }
        let mut latest: Vec<&GossipEvent> = latest.into_values().collect();
        latest.sort_by_key(|event| event.creator());

        let mut creator = self.creator.lock();
        creator.set_event_window(window);
        for event in &latest {
            creator.register_event(event);
        }
        info!(
            "Loaded {} of {} events into the event creator",
            latest.len(),
            events.len()
        );
    }

    pub fn update_platform_status(&self, status: PlatformStatus) {
        self.platform_status.set_platform_status(status);
    }

    pub fn platform_status(&self) -> PlatformStatus {
        self.platform_status.platform_status()
    }

    pub fn report_unhealthy_duration(&self, duration: Duration) {
        self.health.report_unhealthy_duration(duration);
    }

    pub fn reconnect_completed(&self, round: u64) {
        self.reconnect.reconnect_completed(round);
    }

    pub fn state_saved(&self, round: u64) {
        self.reconnect.state_saved(round);
    }

    /// Outcome of the latest creation attempt
    pub fn status(&self) -> EventCreationStatus {
        *self.status.read()
    }

    pub(crate) fn set_status(&self, status: EventCreationStatus) {
        *self.status.write() = status;
    }

    pub fn stats(&self) -> CreationStats {
        self.stats.read().clone()
    }

    pub(crate) fn record_buffered_rejection(&self) {
        self.stats.write().buffered_rejections += 1;
    }

    /// Run `f` against the creator while holding its lock
    pub fn with_creator<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.creator.lock())
    }
}
