//! Network-level behavior of the tipset event creator

mod common;

use common::{foreign_event, init_tracing, roster, Network};
use lace_core::clock::ManualClock;
use lace_core::types::NodeId;
use lace_creator::{
    EventCreationConfig, EventCreator, Ed25519Signer, TipsetEventCreator, TransactionQueue,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

fn creator_for(weights: &[u64], self_id: u64, config: &EventCreationConfig) -> TipsetEventCreator {
    TipsetEventCreator::new(
        NodeId::new(self_id),
        roster(weights),
        config,
        Arc::new(ManualClock::at_epoch()),
        Arc::new(Ed25519Signer::from_bytes(&[9u8; 32])),
        Arc::new(TransactionQueue::new(8)),
        Box::new(ChaCha8Rng::seed_from_u64(self_id)),
    )
    .unwrap()
}

#[test]
fn test_round_robin_never_runs_out_of_parents() {
    init_tracing();
    let config = EventCreationConfig::default();
    for seed in 0..3 {
        let mut network = Network::new(&[1; 10], &config, seed);
        for round in 0..100 {
            for node in 0..10 {
                let event = network.create(node);
                assert!(
                    event.is_some(),
                    "node {} declined in round {} (seed {})",
                    node,
                    round,
                    seed
                );
            }
        }
    }
}

#[test]
fn test_parents_are_exhausted_until_new_events_arrive() {
    init_tracing();
    let config = EventCreationConfig::default();
    let mut creator = creator_for(&[1; 4], 0, &config);

    let genesis = creator.maybe_create_event().unwrap().unwrap();
    assert_eq!(genesis.generation(), 1);
    assert!(genesis.self_parent().is_none());
    assert!(genesis.other_parent().is_none());

    let peers: Vec<_> = (1..4).map(|id| foreign_event(id, None, None)).collect();
    for peer in &peers {
        creator.register_event(peer);
    }

    let mut used = Vec::new();
    let mut latest = genesis;
    for _ in 0..3 {
        let event = creator.maybe_create_event().unwrap().unwrap();
        assert_eq!(event.self_parent(), Some(&latest.descriptor()));
        used.push(event.other_parent().unwrap().creator);
        latest = event;
    }
    used.sort();
    assert_eq!(used, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);

    assert!(creator.maybe_create_event().unwrap().is_none());
    assert!(creator.maybe_create_event().unwrap().is_none());

    let news = foreign_event(1, Some(&peers[0]), Some(&latest));
    creator.register_event(&news);
    let event = creator.maybe_create_event().unwrap().unwrap();
    assert_eq!(event.other_parent(), Some(&news.descriptor()));
}

#[test]
fn test_zero_weight_node_is_still_used() {
    init_tracing();
    let mut weights = [1u64; 10];
    weights[0] = 0;
    let config = EventCreationConfig::default();

    for seed in 0..3 {
        let mut network = Network::new(&weights, &config, seed);
        let mut order: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut zero_weight_parent_count = 0;

        for _ in 0..100 {
            order.shuffle(&mut rng);
            for &node in &order {
                if let Some(event) = network.create(node) {
                    if event.other_parent().map(|p| p.creator) == Some(NodeId::new(0)) {
                        zero_weight_parent_count += 1;
                    }
                }
            }
        }

        assert!(
            zero_weight_parent_count > 20,
            "zero weight node used only {} times (seed {})",
            zero_weight_parent_count,
            seed
        );
    }
}

#[test]
fn test_ignored_node_accumulates_selfishness() {
    init_tracing();
    let config = EventCreationConfig {
        anti_selfishness_factor: 0.0,
        ..Default::default()
    };
    let mut a = creator_for(&[1; 4], 0, &config);
    let d = NodeId::new(3);

    let a1 = a.maybe_create_event().unwrap().unwrap();
    let b1 = foreign_event(1, None, None);
    let c1 = foreign_event(2, None, None);
    let d1 = foreign_event(3, None, None);
    for event in [&b1, &c1, &d1] {
        a.register_event(event);
    }

    // first cycle: B and C build on each other, nobody touches D
    let b2 = foreign_event(1, Some(&b1), Some(&c1));
    a.register_event(&b2);
    let a2 = a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a2.other_parent(), Some(&b2.descriptor()));
    assert_eq!(a.weight_calculator().get_selfishness_score_for_node(d), 1);
    assert_eq!(a.weight_calculator().get_max_selfishness_score(), 1);

    // second cycle, still ignoring D
    let c2 = foreign_event(2, Some(&c1), Some(&a2));
    let b3 = foreign_event(1, Some(&b2), Some(&c2));
    a.register_event(&c2);
    a.register_event(&b3);
    let a3 = a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a3.other_parent(), Some(&b3.descriptor()));
    assert_eq!(a.weight_calculator().get_selfishness_score_for_node(d), 2);
    assert_eq!(a.weight_calculator().get_max_selfishness_score(), 2);
    for node in 1..3 {
        assert_eq!(
            a.weight_calculator()
                .get_selfishness_score_for_node(NodeId::new(node)),
            0
        );
    }

    // D's events get used again
    let d2 = foreign_event(3, Some(&d1), Some(&a3));
    a.register_event(&d2);
    let a4 = a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a4.other_parent(), Some(&d2.descriptor()));
    assert_eq!(a.weight_calculator().get_selfishness_score_for_node(d), 2);

    let b4 = foreign_event(1, Some(&b3), Some(&d2));
    a.register_event(&b4);
    let a5 = a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a5.other_parent(), Some(&b4.descriptor()));
    assert_eq!(a.weight_calculator().get_selfishness_score_for_node(d), 0);
    assert_eq!(a.weight_calculator().get_max_selfishness_score(), 0);
    assert_eq!(a1.generation(), 1);
}

#[test]
fn test_selfishness_pushes_ignored_node_forward() {
    init_tracing();
    // with a large chance, an ignored node is picked even when others score higher
    let config = EventCreationConfig {
        anti_selfishness_factor: 0.5,
        ..Default::default()
    };
    let mut a = creator_for(&[1; 4], 0, &config);
    let d = NodeId::new(3);

    a.maybe_create_event().unwrap().unwrap();
    let b1 = foreign_event(1, None, None);
    let c1 = foreign_event(2, None, None);
    let d1 = foreign_event(3, None, None);
    for event in [&b1, &c1, &d1] {
        a.register_event(event);
    }

    let b2 = foreign_event(1, Some(&b1), Some(&c1));
    a.register_event(&b2);
    let a2 = a.maybe_create_event().unwrap().unwrap();
    let c2 = foreign_event(2, Some(&c1), Some(&a2));
    let b3 = foreign_event(1, Some(&b2), Some(&c2));
    a.register_event(&c2);
    a.register_event(&b3);
    a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a.weight_calculator().get_max_selfishness_score(), 2);

    // chance is (2 - 1) / 0.5, so D is always chosen over B
    let b4 = foreign_event(1, Some(&b3), None);
    a.register_event(&b4);
    let a4 = a.maybe_create_event().unwrap().unwrap();
    assert_eq!(a4.other_parent(), Some(&d1.descriptor()));
    assert_eq!(a.weight_calculator().get_selfishness_score_for_node(d), 2);
}
