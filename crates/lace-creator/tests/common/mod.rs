//! Helpers shared by the integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use lace_core::clock::ManualClock;
use lace_core::event::{GossipEvent, Signature, Transaction, UnsignedEvent};
use lace_core::roster::{Roster, RosterEntry};
use lace_core::types::{EventDescriptor, NodeId, FIRST_ROUND};
use lace_creator::{
    EventCreationConfig, EventCreator, Ed25519Signer, TipsetEventCreator, TransactionQueue,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

pub fn roster(weights: &[u64]) -> Arc<Roster> {
    let entries = weights
        .iter()
        .enumerate()
        .map(|(i, weight)| RosterEntry::new(NodeId::new(i as u64), *weight))
        .collect();
    Arc::new(Roster::new(entries).unwrap())
}

pub struct Node {
    pub id: NodeId,
    pub creator: TipsetEventCreator,
    pub transactions: Arc<TransactionQueue>,
    pub signer: Arc<Ed25519Signer>,
}

/// A set of creators that see each other's events immediately
pub struct Network {
    pub nodes: Vec<Node>,
    pub clock: Arc<ManualClock>,
}

impl Network {
    pub fn new(weights: &[u64], config: &EventCreationConfig, seed: u64) -> Self {
        let roster = roster(weights);
        let clock = Arc::new(ManualClock::at_epoch());
        let nodes = (0..weights.len())
            .map(|i| {
                let id = NodeId::new(i as u64);
                let transactions = Arc::new(TransactionQueue::new(8));
                let signer = Arc::new(Ed25519Signer::from_bytes(&[i as u8 + 1; 32]));
                let creator = TipsetEventCreator::new(
                    id,
                    roster.clone(),
                    config,
                    clock.clone(),
                    signer.clone(),
                    transactions.clone(),
                    Box::new(ChaCha8Rng::seed_from_u64(seed * 1000 + i as u64)),
                )
                .unwrap();
                Node {
                    id,
                    creator,
                    transactions,
                    signer,
                }
            })
            .collect();
        Self { nodes, clock }
    }

    /// Ask one node for an event and hand it to every other node
    pub fn create(&mut self, index: usize) -> Option<GossipEvent> {
        let event = self.nodes[index].creator.maybe_create_event().unwrap()?;
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if i != index {
                node.creator.register_event(&event);
            }
        }
        Some(event)
    }
}

/// Build an event as some other node would have, with a dummy signature
pub fn foreign_event(
    creator: u64,
    self_parent: Option<&GossipEvent>,
    other_parent: Option<&GossipEvent>,
) -> GossipEvent {
    let self_parent: Option<EventDescriptor> = self_parent.map(GossipEvent::descriptor);
    let other_parent: Option<EventDescriptor> = other_parent.map(GossipEvent::descriptor);
    let generation = self_parent
        .iter()
        .chain(other_parent.iter())
        .map(|parent| parent.generation)
        .max()
        .map_or(1, |max| max + 1);
    let unsigned = UnsignedEvent::new(
        NodeId::new(creator),
        self_parent,
        other_parent,
        generation,
        FIRST_ROUND,
        DateTime::<Utc>::UNIX_EPOCH,
        Vec::<Transaction>::new(),
    );
    GossipEvent::new(unsigned, Signature::new(vec![0; 64]))
}

/// Route creator logs to the test output; filter with RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
