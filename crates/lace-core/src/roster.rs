//! Roster - the participants of the current consensus epoch and their weights

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LaceError, Result};
use crate::types::NodeId;

/// A single participant and its stake weight
///
/// Weight 0 marks a non-voting participant that still has to be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub node_id: NodeId,
    pub weight: u64,
}

impl RosterEntry {
    pub fn new(node_id: NodeId, weight: u64) -> Self {
        Self { node_id, weight }
    }
}

/// Ordered set of participants
///
/// Entries are sorted by node id; the position of a node in that order is
/// its index into per-node arrays such as tipsets.
#[derive(Clone, Debug)]
pub struct Roster {
    entries: Vec<RosterEntry>,
    index: HashMap<NodeId, usize>,
    total_weight: u64,
}

impl Roster {
    /// Build a roster, rejecting empty and duplicated entries
    pub fn new(mut entries: Vec<RosterEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(LaceError::EmptyRoster);
        }
        entries.sort_by_key(|entry| entry.node_id);

        let mut index = HashMap::with_capacity(entries.len());
        let mut total_weight: u64 = 0;
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.node_id, position).is_some() {
                return Err(LaceError::DuplicateRosterEntry(entry.node_id));
            }
            total_weight = total_weight
                .checked_add(entry.weight)
                .ok_or_else(|| LaceError::InvalidInput("roster weight overflows u64".into()))?;
        }
        if total_weight == 0 {
            return Err(LaceError::ZeroTotalWeight);
        }
        debug!(
            "Roster of {} nodes, total weight {}",
            entries.len(),
            total_weight
        );

        Ok(Self {
            entries,
            index,
            total_weight,
        })
    }

    /// Roster where every node in `0..count` has the same weight
    pub fn uniform(count: u64, weight: u64) -> Result<Self> {
        Self::new(
            (0..count)
                .map(|id| RosterEntry::new(NodeId::new(id), weight))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.index.contains_key(&node_id)
    }

    /// Position of a node in the roster order
    pub fn index_of(&self, node_id: NodeId) -> Option<usize> {
        self.index.get(&node_id).copied()
    }

    /// Weight of a node, or `None` when it is not in the roster
    pub fn weight_of(&self, node_id: NodeId) -> Option<u64> {
        self.index_of(node_id).map(|i| self.entries[i].weight)
    }

    pub fn entry(&self, index: usize) -> Option<&RosterEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|entry| entry.node_id)
    }
}
