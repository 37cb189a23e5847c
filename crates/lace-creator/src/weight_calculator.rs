//! # Tipset Weight Calculator
//!
//! Measures how much this node's events move the DAG toward agreement.
//!
//! The calculator keeps a *snapshot*: the tipset of the last self event from
//! which a supermajority of weight had been seen to advance. Each new self
//! event banks the weight it advances past the snapshot; once the banked
//! weight plus our own crosses the supermajority threshold, that event's
//! tipset becomes the new snapshot and the bank starts over.
//!
//! ```text
//!   snapshot ──► self event ──► self event ──► self event (> 2/3 advanced)
//!                 +w(B)          +w(C)          snapshot := this tipset
//! ```
//!
//! At every snapshot change the calculator also counts, per participant,
//! how many consecutive cycles that participant had a usable frontier event
//! which we did not build on. Those selfishness scores let the creator give
//! starved participants a turn.

use lace_core::roster::Roster;
use lace_core::types::{EventDescriptor, NodeId};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::childless_tracker::ChildlessEventTracker;
use crate::error::{CreationError, CreationResult};
use crate::tipset::{AdvancementWeight, Tipset};
use crate::tipset_tracker::TipsetTracker;

/// Fraction of total weight that must be exceeded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Threshold {
    pub numerator: u64,
    pub denominator: u64,
}

impl Threshold {
    pub const SUPER_MAJORITY: Self = Self {
        numerator: 2,
        denominator: 3,
    };

    /// True if `part / whole` is strictly greater than the fraction
    pub fn is_exceeded_by(&self, part: u64, whole: u64) -> bool {
        (part as u128) * (self.denominator as u128) > (whole as u128) * (self.numerator as u128)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::SUPER_MAJORITY
    }
}

/// Tracks snapshot progress and per-node selfishness for one creator
pub struct TipsetWeightCalculator {
    roster: Arc<Roster>,
    self_id: NodeId,
    self_weight: u64,
    threshold: Threshold,

    /// Baseline for advancement
    snapshot: Tipset,

    /// Weight banked by self events since the snapshot was taken
    banked: AdvancementWeight,

    /// Consecutive ignored snapshot cycles, indexed like the roster
    selfishness: Vec<u64>,
    max_selfishness: u64,
}

impl TipsetWeightCalculator {
    pub fn new(roster: Arc<Roster>, self_id: NodeId, threshold: Threshold) -> Self {
        let self_weight = roster.weight_of(self_id).unwrap_or(0);
        let selfishness = vec![0; roster.len()];
        Self {
            snapshot: Tipset::new(roster.clone()),
            roster,
            self_id,
            self_weight,
            threshold,
            banked: AdvancementWeight::ZERO,
            selfishness,
            max_selfishness: 0,
        }
    }

    /// Bank the advancement of a new self event
    ///
    /// The event must already be in `tipsets`. Returns the advancement this
    /// event added on top of what earlier self events had already banked.
    pub fn add_event_and_get_advancement_weight(
        &mut self,
        descriptor: &EventDescriptor,
        tipsets: &TipsetTracker,
        childless: &ChildlessEventTracker,
    ) -> CreationResult<AdvancementWeight> {
        let tipset = tipsets
            .get_tipset(descriptor)
            .ok_or(CreationError::UntrackedEvent(*descriptor))?;

        let advancement = self.snapshot.advancement_weight(self.self_id, tipset);
        let delta = advancement.saturating_sub(self.banked);
        self.banked += delta;

        let total_weight = self.roster.total_weight();
        if self
            .threshold
            .is_exceeded_by(self.banked.weighted + self.self_weight, total_weight)
        {
            let previous = std::mem::replace(&mut self.snapshot, tipset.clone());
            self.banked = AdvancementWeight::ZERO;
            self.update_selfishness_scores(&previous, childless);
            debug!(
                "Snapshot advanced at {} (max selfishness {})",
                descriptor, self.max_selfishness
            );
        }

        Ok(delta)
    }

    /// Advancement a new event with these parents would add, without
    /// changing any state
    ///
    /// Parents that are not tracked are ignored. The result is relative to
    /// the weight already banked, so the latest self event alone scores zero.
    pub fn get_theoretical_advancement_weight(
        &self,
        parents: &[EventDescriptor],
        tipsets: &TipsetTracker,
    ) -> AdvancementWeight {
        let parent_tipsets = parents.iter().filter_map(|parent| tipsets.get_tipset(parent));
        match Tipset::merge(parent_tipsets) {
            Some(merged) => self
                .snapshot
                .advancement_weight(self.self_id, &merged)
                .saturating_sub(self.banked),
            None => AdvancementWeight::ZERO,
        }
    }

    fn update_selfishness_scores(&mut self, previous: &Tipset, childless: &ChildlessEventTracker) {
        let mut max_selfishness = 0;
        for (index, node_id) in self.roster.node_ids().enumerate() {
            if node_id == self.self_id {
                continue;
            }

            let previous_tip = previous.generation(node_id);
            let latest_snapshot_tip = self.snapshot.generation(node_id);
            let advanced = latest_snapshot_tip > previous_tip;
            let ignored = !advanced
                && childless
                    .childless_events_by(node_id)
                    .iter()
                    .any(|tip| tip.generation > latest_snapshot_tip);

            if ignored {
                self.selfishness[index] += 1;
                trace!(
                    "{} ignored for another cycle (snapshot tip {}, score {})",
                    node_id,
                    latest_snapshot_tip,
                    self.selfishness[index]
                );
            } else {
                self.selfishness[index] = 0;
            }
            max_selfishness = max_selfishness.max(self.selfishness[index]);
        }
        self.max_selfishness = max_selfishness;
    }

    /// How many consecutive snapshot cycles we have ignored a node
    pub fn get_selfishness_score_for_node(&self, node_id: NodeId) -> u64 {
        self.roster
            .index_of(node_id)
            .map(|index| self.selfishness[index])
            .unwrap_or(0)
    }

    /// Highest selfishness score across the roster
    pub fn get_max_selfishness_score(&self) -> u64 {
        self.max_selfishness
    }

    pub fn snapshot(&self) -> &Tipset {
        &self.snapshot
    }

    /// Weight banked since the last snapshot
    pub fn banked_weight(&self) -> AdvancementWeight {
        self.banked
    }

    /// Back to the initial state: empty snapshot, nothing banked, no scores
    pub fn clear(&mut self) {
        self.snapshot = Tipset::new(self.roster.clone());
        self.banked = AdvancementWeight::ZERO;
        self.selfishness.iter_mut().for_each(|score| *score = 0);
        self.max_selfishness = 0;
    }
}
