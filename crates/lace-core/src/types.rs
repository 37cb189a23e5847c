//! Core type definitions for Lace
//!
//! Identifiers, event descriptors and the event window that decides which
//! part of the DAG is still relevant to event creation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation of the first event a creator emits.
pub const FIRST_GENERATION: u64 = 1;

/// Tipset slot value for a creator with no known ancestor event.
///
/// Real generations start at [`FIRST_GENERATION`], so this never collides
/// with the generation of an actual event.
pub const UNDEFINED_GENERATION: u64 = 0;

/// The first consensus round.
pub const FIRST_ROUND: u64 = 1;

/// Round value used before any round has reached consensus.
pub const UNDEFINED_ROUND: u64 = 0;

/// NodeId - Opaque, totally ordered participant identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

/// EventHash - Content hash of an event computed with BLAKE3
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EventHash {
    hash: [u8; 32],
}

impl EventHash {
    /// Create a new EventHash from raw bytes
    pub fn new(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Hash arbitrary content
    pub fn from_content(content: &[u8]) -> Self {
        Self {
            hash: *blake3::hash(content).as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Which event property decides whether an event is ancient
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncientMode {
    /// Events below the threshold generation are ancient
    #[default]
    Generation,

    /// Events whose birth round is below the threshold round are ancient
    BirthRound,
}

/// EventDescriptor - Immutable identity of an event
///
/// Used as the key of every per-event map in the creator, so it carries
/// only what pruning and parent selection need.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Content hash of the event
    pub hash: EventHash,

    /// Node that created the event
    pub creator: NodeId,

    /// 1 + max generation of the parents
    pub generation: u64,

    /// Pending consensus round when the event was created
    pub birth_round: u64,
}

impl EventDescriptor {
    pub fn new(hash: EventHash, creator: NodeId, generation: u64, birth_round: u64) -> Self {
        Self {
            hash,
            creator,
            generation,
            birth_round,
        }
    }

    /// The value compared against the ancient threshold
    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::Generation => self.generation,
            AncientMode::BirthRound => self.birth_round,
        }
    }
}

impl fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventDescriptor({} g{} r{} {})",
            self.creator, self.generation, self.birth_round, self.hash
        )
    }
}

impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:g{}:{}", self.creator, self.generation, self.hash)
    }
}

/// EventWindow - The boundary between relevant and ancient events
///
/// Pushed by the consensus layer whenever a round reaches consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    latest_consensus_round: u64,
    ancient_threshold: u64,
    ancient_mode: AncientMode,
}

impl EventWindow {
    pub fn new(latest_consensus_round: u64, ancient_threshold: u64, ancient_mode: AncientMode) -> Self {
        Self {
            latest_consensus_round,
            ancient_threshold,
            ancient_mode,
        }
    }

    /// Window before any round has reached consensus; nothing is ancient.
    pub fn genesis(ancient_mode: AncientMode) -> Self {
        let ancient_threshold = match ancient_mode {
            AncientMode::Generation => FIRST_GENERATION,
            AncientMode::BirthRound => FIRST_ROUND,
        };
        Self::new(UNDEFINED_ROUND, ancient_threshold, ancient_mode)
    }

    pub fn latest_consensus_round(&self) -> u64 {
        self.latest_consensus_round
    }

    /// The round that will next reach consensus
    pub fn pending_consensus_round(&self) -> u64 {
        self.latest_consensus_round + 1
    }

    pub fn ancient_threshold(&self) -> u64 {
        self.ancient_threshold
    }

    pub fn ancient_mode(&self) -> AncientMode {
        self.ancient_mode
    }

    /// Check if an ancient indicator falls below the threshold
    pub fn is_ancient_indicator(&self, indicator: u64) -> bool {
        indicator < self.ancient_threshold
    }

    /// Check if an event is ancient under this window
    pub fn is_ancient(&self, descriptor: &EventDescriptor) -> bool {
        self.is_ancient_indicator(descriptor.ancient_indicator(self.ancient_mode))
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::genesis(AncientMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(generation: u64, birth_round: u64) -> EventDescriptor {
        EventDescriptor::new(
            EventHash::from_content(&generation.to_le_bytes()),
            NodeId::new(3),
            generation,
            birth_round,
        )
    }

    #[test]
    fn test_genesis_window_has_nothing_ancient() {
        let window = EventWindow::genesis(AncientMode::Generation);
        assert!(!window.is_ancient(&descriptor(FIRST_GENERATION, FIRST_ROUND)));
        assert_eq!(window.pending_consensus_round(), FIRST_ROUND);

        let window = EventWindow::genesis(AncientMode::BirthRound);
        assert!(!window.is_ancient(&descriptor(FIRST_GENERATION, FIRST_ROUND)));
    }

    #[test]
    fn test_ancient_indicator_follows_mode() {
        let event = descriptor(10, 2);

        let by_generation = EventWindow::new(5, 11, AncientMode::Generation);
        assert!(by_generation.is_ancient(&event));

        let by_round = EventWindow::new(5, 2, AncientMode::BirthRound);
        assert!(!by_round.is_ancient(&event));

        let by_round = EventWindow::new(5, 3, AncientMode::BirthRound);
        assert!(by_round.is_ancient(&event));
    }

    #[test]
    fn test_node_id_ordering() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert_eq!(NodeId::from(7).id(), 7);
        assert_eq!(format!("{}", NodeId::new(4)), "node4");
    }

    #[test]
    fn test_ancient_mode_serde_names() {
        let json = serde_json::to_string(&AncientMode::BirthRound).unwrap();
        assert_eq!(json, "\"birth_round\"");
    }
}
