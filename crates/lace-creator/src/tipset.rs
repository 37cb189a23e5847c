//! # Tipsets
//!
//! A tipset summarizes the ancestry of one event: for every roster member it
//! records the highest generation of that member's events known to be an
//! ancestor. Tipsets only ever grow, and merging takes the per-node maximum,
//! so a child's tipset is the merge of its parents' advanced by itself.
//!
//! ```text
//!   parent A: [3, 1, 0, 2]
//!   parent B: [1, 4, 0, 2]
//!   merge   : [3, 4, 0, 2]   advance(node1, 5) -> [3, 5, 0, 2]
//! ```

use lace_core::roster::Roster;
use lace_core::types::{NodeId, UNDEFINED_GENERATION};
use std::ops::{Add, AddAssign};
use std::sync::Arc;
use tracing::trace;

/// How far a tipset moves the DAG frontier past a baseline
///
/// Progress of weighted participants counts toward the supermajority;
/// progress of zero-weight participants is tracked separately so it can be
/// rewarded during parent selection without ever counting toward it.
/// Ordering is lexicographic: weighted progress first, then zero-weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdvancementWeight {
    /// Sum of the weights of advanced participants
    pub weighted: u64,

    /// Number of advanced zero-weight participants
    pub zero_weight: u64,
}

impl AdvancementWeight {
    pub const ZERO: Self = Self {
        weighted: 0,
        zero_weight: 0,
    };

    pub fn new(weighted: u64, zero_weight: u64) -> Self {
        Self {
            weighted,
            zero_weight,
        }
    }

    /// True if either component is non-zero
    pub fn is_non_zero(&self) -> bool {
        self.weighted != 0 || self.zero_weight != 0
    }

    /// Component-wise difference, clamped at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            weighted: self.weighted.saturating_sub(other.weighted),
            zero_weight: self.zero_weight.saturating_sub(other.zero_weight),
        }
    }
}

impl Add for AdvancementWeight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            weighted: self.weighted + other.weighted,
            zero_weight: self.zero_weight + other.zero_weight,
        }
    }
}

impl AddAssign for AdvancementWeight {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Per-event ancestry summary, one generation slot per roster member
#[derive(Clone, Debug)]
pub struct Tipset {
    roster: Arc<Roster>,
    tips: Vec<u64>,
}

impl Tipset {
    /// Tipset with no known ancestors
    pub fn new(roster: Arc<Roster>) -> Self {
        let tips = vec![UNDEFINED_GENERATION; roster.len()];
        Self { roster, tips }
    }

    /// Per-node maximum of the given tipsets
    ///
    /// Returns `None` when given nothing to merge; a genesis event has no
    /// parent tipsets and must start from [`Tipset::new`] instead.
    pub fn merge<'a, I>(tipsets: I) -> Option<Tipset>
    where
        I: IntoIterator<Item = &'a Tipset>,
    {
        let mut tipsets = tipsets.into_iter();
        let mut merged = tipsets.next()?.clone();
        for tipset in tipsets {
            debug_assert_eq!(merged.tips.len(), tipset.tips.len(), "tipsets from different rosters");
            for (tip, other) in merged.tips.iter_mut().zip(&tipset.tips) {
                *tip = (*tip).max(*other);
            }
        }
        Some(merged)
    }

    /// Raise the slot of `creator` to `generation` if that is higher
    pub fn advance(&mut self, creator: NodeId, generation: u64) -> &mut Self {
        match self.roster.index_of(creator) {
            Some(index) => {
                let tip = &mut self.tips[index];
                *tip = (*tip).max(generation);
            }
            None => trace!("Ignoring tipset advance for {} outside the roster", creator),
        }
        self
    }

    /// Highest known ancestor generation for a node
    pub fn generation(&self, node_id: NodeId) -> u64 {
        self.roster
            .index_of(node_id)
            .map(|index| self.tips[index])
            .unwrap_or(UNDEFINED_GENERATION)
    }

    /// Number of slots (the roster size)
    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    /// Weight of the participants (other than `self_id`) that `newer` has
    /// advanced past this tipset
    pub fn advancement_weight(&self, self_id: NodeId, newer: &Tipset) -> AdvancementWeight {
        let mut weight = AdvancementWeight::ZERO;
        for (index, entry) in self.roster.iter().enumerate() {
            if entry.node_id == self_id {
                continue;
            }
            let newer_tip = newer.tips.get(index).copied().unwrap_or(UNDEFINED_GENERATION);
            if newer_tip > self.tips[index] {
                if entry.weight > 0 {
                    weight.weighted += entry.weight;
                } else {
                    weight.zero_weight += 1;
                }
            }
        }
        weight
    }
}

impl PartialEq for Tipset {
    fn eq(&self, other: &Self) -> bool {
        self.tips == other.tips
    }
}

impl Eq for Tipset {}
