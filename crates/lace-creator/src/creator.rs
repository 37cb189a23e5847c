//! # Event Creator
//!
//! Decides whether this node can create an event right now and, if so,
//! which frontier event to reference as its other parent.
//!
//! ## Algorithm
//!
//! ```text
//! function MAYBE_CREATE_EVENT():
//!     if no self event yet and genesis is not ancient:
//!         return BUILD(parents = none)                      // genesis
//!     candidates ← childless events of other roster members, not ancient
//!     for c in candidates:
//!         w(c) ← theoretical advancement of {self parent, c}
//!     candidates ← { c | w(c) ≠ 0 }
//!     if candidates = ∅: return NONE                         // nothing new
//!     other ← max by (w.weighted, w.zero_weight, selfishness(c.creator),
//!                     lowest creator id, lowest hash)
//!     return BUILD(self parent, other)
//! ```
//!
//! While some participant has been ignored for more than one snapshot cycle,
//! the creator occasionally (with probability growing with the worst score)
//! picks among the ignored participants' events instead.

use chrono::{DateTime, Utc};
use lace_core::clock::Clock;
use lace_core::event::{GossipEvent, UnsignedEvent};
use lace_core::roster::Roster;
use lace_core::types::{
    AncientMode, EventDescriptor, EventWindow, NodeId, FIRST_GENERATION, FIRST_ROUND,
};
use lace_core::LaceError;
use rand::{Rng, RngCore};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::childless_tracker::ChildlessEventTracker;
use crate::config::EventCreationConfig;
use crate::error::CreationResult;
use crate::signer::{Signer, TransactionSupplier};
use crate::tipset::AdvancementWeight;
use crate::tipset_tracker::TipsetTracker;
use crate::weight_calculator::TipsetWeightCalculator;

/// Something that can create this node's events
///
/// Implementations are driven by a single owner; callers that share one
/// across threads put it behind a lock (see `EventCreationManager`).
pub trait EventCreator: Send {
    /// Create an event if one can be created now
    fn maybe_create_event(&mut self) -> CreationResult<Option<GossipEvent>>;

    /// Learn about an event created by anyone, including ourselves
    fn register_event(&mut self, event: &GossipEvent);

    /// Adopt a new event window and prune what became ancient
    fn set_event_window(&mut self, window: EventWindow);

    /// Forget all tracked state, as if at genesis
    fn clear(&mut self);
}

/// What the creator remembers about its latest own event
#[derive(Clone, Debug)]
struct SelfParent {
    descriptor: EventDescriptor,
    time_created: DateTime<Utc>,
    transaction_count: usize,
}

impl SelfParent {
    fn of(event: &GossipEvent) -> Self {
        Self {
            descriptor: event.descriptor(),
            time_created: event.time_created(),
            transaction_count: event.transactions().len(),
        }
    }
}

/// Event creator that picks other parents by tipset advancement
pub struct TipsetEventCreator {
    self_id: NodeId,
    roster: Arc<Roster>,
    ancient_mode: AncientMode,
    anti_selfishness_factor: f64,

    clock: Arc<dyn Clock>,
    signer: Arc<dyn Signer>,
    transactions: Arc<dyn TransactionSupplier>,
    rng: Box<dyn RngCore + Send>,

    event_window: EventWindow,
    tipset_tracker: TipsetTracker,
    childless: ChildlessEventTracker,
    weight_calculator: TipsetWeightCalculator,
    last_self_event: Option<SelfParent>,
}

impl TipsetEventCreator {
    pub fn new(
        self_id: NodeId,
        roster: Arc<Roster>,
        config: &EventCreationConfig,
        clock: Arc<dyn Clock>,
        signer: Arc<dyn Signer>,
        transactions: Arc<dyn TransactionSupplier>,
        rng: Box<dyn RngCore + Send>,
    ) -> CreationResult<Self> {
        if !roster.contains(self_id) {
            return Err(LaceError::UnknownNode(self_id).into());
        }
        config.validate()?;

        let ancient_mode = config.ancient_mode;
        Ok(Self {
            self_id,
            ancient_mode,
            anti_selfishness_factor: config.anti_selfishness_factor,
            clock,
            signer,
            transactions,
            rng,
            event_window: EventWindow::genesis(ancient_mode),
            tipset_tracker: TipsetTracker::new(roster.clone(), ancient_mode),
            childless: ChildlessEventTracker::new(),
            weight_calculator: TipsetWeightCalculator::new(roster.clone(), self_id, config.threshold()),
            roster,
            last_self_event: None,
        })
    }

    pub fn self_id(&self) -> NodeId {
        self.self_id
    }

    pub fn event_window(&self) -> &EventWindow {
        &self.event_window
    }

    pub fn tipset_tracker(&self) -> &TipsetTracker {
        &self.tipset_tracker
    }

    pub fn childless_events(&self) -> &ChildlessEventTracker {
        &self.childless
    }

    pub fn weight_calculator(&self) -> &TipsetWeightCalculator {
        &self.weight_calculator
    }

    /// Descriptor of the event the next one will use as self parent
    pub fn last_self_event(&self) -> Option<&EventDescriptor> {
        self.last_self_event.as_ref().map(|parent| &parent.descriptor)
    }

    fn genesis_is_ancient(&self) -> bool {
        let indicator = match self.ancient_mode {
            AncientMode::Generation => FIRST_GENERATION,
            AncientMode::BirthRound => FIRST_ROUND,
        };
        self.event_window.is_ancient_indicator(indicator)
    }

    fn score(&self, self_parent: Option<EventDescriptor>, candidate: EventDescriptor) -> AdvancementWeight {
        let mut parents = Vec::with_capacity(2);
        parents.extend(self_parent);
        parents.push(candidate);
        self.weight_calculator
            .get_theoretical_advancement_weight(&parents, &self.tipset_tracker)
    }

    /// Other-parent candidates that would advance the DAG, with their scores
    fn eligible_other_parents(
        &self,
        self_parent: Option<EventDescriptor>,
    ) -> Vec<(EventDescriptor, AdvancementWeight)> {
        self.childless
            .get_childless_events()
            .into_iter()
            .filter(|candidate| {
                candidate.creator != self.self_id
                    && self.roster.contains(candidate.creator)
                    && !self.event_window.is_ancient(candidate)
            })
            .filter_map(|candidate| {
                let weight = self.score(self_parent, candidate);
                weight.is_non_zero().then_some((candidate, weight))
            })
            .collect()
    }

    fn choose_other_parent(&mut self, self_parent: Option<EventDescriptor>) -> Option<EventDescriptor> {
        let candidates = self.eligible_other_parents(self_parent);
        if candidates.is_empty() {
            return None;
        }

        if let Some(chosen) = self.choose_to_reduce_selfishness(&candidates) {
            return Some(chosen);
        }

        let calculator = &self.weight_calculator;
        candidates
            .into_iter()
            .max_by(|(a, a_weight), (b, b_weight)| {
                a_weight
                    .cmp(b_weight)
                    .then_with(|| {
                        calculator
                            .get_selfishness_score_for_node(a.creator)
                            .cmp(&calculator.get_selfishness_score_for_node(b.creator))
                    })
                    .then_with(|| b.creator.cmp(&a.creator))
                    .then_with(|| b.hash.cmp(&a.hash))
            })
            .map(|(chosen, _)| chosen)
    }

    /// With a probability that grows with the worst selfishness score, pick
    /// among the ignored nodes' events, weighted by score squared
    fn choose_to_reduce_selfishness(
        &mut self,
        candidates: &[(EventDescriptor, AdvancementWeight)],
    ) -> Option<EventDescriptor> {
        if self.anti_selfishness_factor <= 0.0 {
            return None;
        }
        let max_selfishness = self.weight_calculator.get_max_selfishness_score();
        let chance = max_selfishness.saturating_sub(1) as f64 / self.anti_selfishness_factor;
        if chance <= 0.0 || self.rng.gen::<f64>() >= chance {
            return None;
        }

        let weighted: Vec<(EventDescriptor, u64)> = candidates
            .iter()
            .filter_map(|(candidate, _)| {
                let score = self
                    .weight_calculator
                    .get_selfishness_score_for_node(candidate.creator);
                (score > 0).then(|| (*candidate, score.saturating_mul(score)))
            })
            .collect();
        let total: u64 = weighted.iter().map(|(_, w)| *w).sum();
        if total == 0 {
            return None;
        }

        let mut pick = self.rng.gen_range(0..total);
        for (candidate, weight) in weighted {
            if pick < weight {
                debug!("Choosing {} to reduce selfishness", candidate);
                return Some(candidate);
            }
            pick -= weight;
        }
        None
    }

    fn build_event(
        &mut self,
        self_parent: Option<EventDescriptor>,
        other_parent: Option<EventDescriptor>,
    ) -> CreationResult<Option<GossipEvent>> {
        let is_genesis = self_parent.is_none() && other_parent.is_none();
        let generation = self_parent
            .iter()
            .chain(other_parent.iter())
            .map(|parent| parent.generation)
            .max()
            .map_or(FIRST_GENERATION, |max| max + 1);
        let birth_round = match self.ancient_mode {
            AncientMode::BirthRound if !is_genesis => self.event_window.pending_consensus_round(),
            _ => FIRST_ROUND,
        };

        let indicator = match self.ancient_mode {
            AncientMode::Generation => generation,
            AncientMode::BirthRound => birth_round,
        };
        if self.event_window.is_ancient_indicator(indicator) {
            debug!(
                "Not creating an event that would be ancient ({} < {})",
                indicator,
                self.event_window.ancient_threshold()
            );
            return Ok(None);
        }

        let now = self.clock.now();
        let time_created = match &self.last_self_event {
            Some(last) => {
                let step = chrono::Duration::nanoseconds(last.transaction_count.max(1) as i64);
                match last.time_created.checked_add_signed(step) {
                    Some(earliest) => now.max(earliest),
                    None => now,
                }
            }
            None => now,
        };

        let transactions = self.transactions.get_transactions_for_event();
        let unsigned = UnsignedEvent::new(
            self.self_id,
            self_parent,
            other_parent,
            generation,
            birth_round,
            time_created,
            transactions,
        );
        let signature = self.signer.sign(unsigned.hash().as_bytes())?;
        let event = GossipEvent::new(unsigned, signature);

        self.track_self_event(&event)?;
        Ok(Some(event))
    }

    fn track_self_event(&mut self, event: &GossipEvent) -> CreationResult<AdvancementWeight> {
        let descriptor = event.descriptor();
        let parents: Vec<EventDescriptor> = event.parents().copied().collect();
        self.tipset_tracker.add_event(descriptor, &parents);
        self.childless.add_event(descriptor, &parents);
        self.last_self_event = Some(SelfParent::of(event));
        self.weight_calculator.add_event_and_get_advancement_weight(
            &descriptor,
            &self.tipset_tracker,
            &self.childless,
        )
    }
}

impl EventCreator for TipsetEventCreator {
    fn maybe_create_event(&mut self) -> CreationResult<Option<GossipEvent>> {
        if self.last_self_event.is_none() && !self.genesis_is_ancient() {
            return self.build_event(None, None);
        }

        let self_parent = self
            .last_self_event
            .as_ref()
            .map(|last| last.descriptor)
            .filter(|descriptor| !self.event_window.is_ancient(descriptor));

        match self.choose_other_parent(self_parent) {
            Some(other_parent) => self.build_event(self_parent, Some(other_parent)),
            None => {
                trace!("No other parent would advance the DAG, not creating an event");
                Ok(None)
            }
        }
    }

    fn register_event(&mut self, event: &GossipEvent) {
        let descriptor = event.descriptor();
        if !self.roster.contains(descriptor.creator) {
            debug!("Ignoring {} from creator outside the roster", descriptor);
            return;
        }
        if self.event_window.is_ancient(&descriptor) {
            debug!("Ignoring ancient event {}", descriptor);
            return;
        }
        if self.tipset_tracker.get_tipset(&descriptor).is_some() {
            trace!("Ignoring duplicate event {}", descriptor);
            return;
        }

        if descriptor.creator == self.self_id {
            let is_newer = self
                .last_self_event
                .as_ref()
                .map_or(true, |last| last.descriptor.generation < descriptor.generation);
            if is_newer {
                if let Err(e) = self.track_self_event(event) {
                    warn!("Failed to bank advancement of replayed self event: {}", e);
                }
                return;
            }
        }

        let parents: Vec<EventDescriptor> = event.parents().copied().collect();
        self.tipset_tracker.add_event(descriptor, &parents);
        self.childless.add_event(descriptor, &parents);
    }

    fn set_event_window(&mut self, window: EventWindow) {
        if window.ancient_mode() != self.ancient_mode {
            warn!(
                "Ignoring event window in {:?} mode, creator runs in {:?} mode",
                window.ancient_mode(),
                self.ancient_mode
            );
            return;
        }
        self.event_window = window;
        self.tipset_tracker.set_event_window(window);
        self.childless.prune_old_events(&window);
    }

    fn clear(&mut self) {
        self.event_window = EventWindow::genesis(self.ancient_mode);
        self.tipset_tracker.clear();
        self.childless.clear();
        self.weight_calculator.clear();
        self.last_self_event = None;
    }
}
