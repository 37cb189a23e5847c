//! Events - the records each node proposes into the DAG
//!
//! An event references up to two parents (its creator's previous event and
//! one event from another creator) and carries a batch of transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{EventDescriptor, EventHash, NodeId};

/// A transaction carried by an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    /// Opaque application payload
    Application(#[serde(with = "serde_bytes")] Vec<u8>),

    /// A node's signature over a saved state
    StateSignature {
        round: u64,
        #[serde(with = "serde_bytes")]
        signature: Vec<u8>,
    },
}

impl Transaction {
    pub fn is_state_signature(&self) -> bool {
        matches!(self, Transaction::StateSignature { .. })
    }

    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        match self {
            Transaction::Application(payload) => {
                hasher.update(&[0u8]);
                hasher.update(&(payload.len() as u64).to_le_bytes());
                hasher.update(payload);
            }
            Transaction::StateSignature { round, signature } => {
                hasher.update(&[1u8]);
                hasher.update(&round.to_le_bytes());
                hasher.update(&(signature.len() as u64).to_le_bytes());
                hasher.update(signature);
            }
        }
    }
}

/// Creator signature over an event hash
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.bytes.len().min(8);
        write!(f, "Signature({}..)", hex::encode(&self.bytes[..shown]))
    }
}

/// An event before it is signed
///
/// The hash is never read from the wire; it is recomputed from the fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EventFields")]
pub struct UnsignedEvent {
    creator: NodeId,
    self_parent: Option<EventDescriptor>,
    other_parent: Option<EventDescriptor>,
    generation: u64,
    birth_round: u64,
    time_created: DateTime<Utc>,
    transactions: Vec<Transaction>,
    #[serde(skip_serializing)]
    hash: EventHash,
}

#[derive(Deserialize)]
struct EventFields {
    creator: NodeId,
    self_parent: Option<EventDescriptor>,
    other_parent: Option<EventDescriptor>,
    generation: u64,
    birth_round: u64,
    time_created: DateTime<Utc>,
    transactions: Vec<Transaction>,
}

impl From<EventFields> for UnsignedEvent {
    fn from(fields: EventFields) -> Self {
        Self::new(
            fields.creator,
            fields.self_parent,
            fields.other_parent,
            fields.generation,
            fields.birth_round,
            fields.time_created,
            fields.transactions,
        )
    }
}

impl UnsignedEvent {
    /// Build an event and compute its hash
    pub fn new(
        creator: NodeId,
        self_parent: Option<EventDescriptor>,
        other_parent: Option<EventDescriptor>,
        generation: u64,
        birth_round: u64,
        time_created: DateTime<Utc>,
        transactions: Vec<Transaction>,
    ) -> Self {
        let hash = Self::compute_hash(
            creator,
            self_parent.as_ref(),
            other_parent.as_ref(),
            generation,
            birth_round,
            time_created,
            &transactions,
        );

        Self {
            creator,
            self_parent,
            other_parent,
            generation,
            birth_round,
            time_created,
            transactions,
            hash,
        }
    }

    fn compute_hash(
        creator: NodeId,
        self_parent: Option<&EventDescriptor>,
        other_parent: Option<&EventDescriptor>,
        generation: u64,
        birth_round: u64,
        time_created: DateTime<Utc>,
        transactions: &[Transaction],
    ) -> EventHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&creator.id().to_le_bytes());
        hasher.update(&generation.to_le_bytes());
        hasher.update(&birth_round.to_le_bytes());
        for parent in [self_parent, other_parent] {
            match parent {
                Some(parent) => {
                    hasher.update(&[1u8]);
                    hasher.update(parent.hash.as_bytes());
                }
                None => {
                    hasher.update(&[0u8]);
                }
            }
        }
        hasher.update(&time_created.timestamp().to_le_bytes());
        hasher.update(&time_created.timestamp_subsec_nanos().to_le_bytes());
        hasher.update(&(transactions.len() as u64).to_le_bytes());
        for transaction in transactions {
            transaction.hash_into(&mut hasher);
        }
        EventHash::new(*hasher.finalize().as_bytes())
    }

    pub fn creator(&self) -> NodeId {
        self.creator
    }

    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.self_parent.as_ref()
    }

    pub fn other_parent(&self) -> Option<&EventDescriptor> {
        self.other_parent.as_ref()
    }

    /// All parents, self-parent first
    pub fn parents(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.self_parent.iter().chain(self.other_parent.iter())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn birth_round(&self) -> u64 {
        self.birth_round
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.time_created
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn hash(&self) -> EventHash {
        self.hash
    }

    pub fn descriptor(&self) -> EventDescriptor {
        EventDescriptor::new(self.hash, self.creator, self.generation, self.birth_round)
    }
}

/// A signed event as exchanged through gossip
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipEvent {
    unsigned: UnsignedEvent,
    signature: Signature,
}

impl GossipEvent {
    pub fn new(unsigned: UnsignedEvent, signature: Signature) -> Self {
        Self {
            unsigned,
            signature,
        }
    }

    pub fn unsigned(&self) -> &UnsignedEvent {
        &self.unsigned
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn creator(&self) -> NodeId {
        self.unsigned.creator
    }

    pub fn generation(&self) -> u64 {
        self.unsigned.generation
    }

    pub fn birth_round(&self) -> u64 {
        self.unsigned.birth_round
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.unsigned.time_created
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.unsigned.transactions
    }

    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.unsigned.self_parent()
    }

    pub fn other_parent(&self) -> Option<&EventDescriptor> {
        self.unsigned.other_parent()
    }

    pub fn parents(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.unsigned.parents()
    }

    pub fn descriptor(&self) -> EventDescriptor {
        self.unsigned.descriptor()
    }
}
