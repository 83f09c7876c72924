//! Routing over real rings of nodes on loopback.

use chord::{ChordNode, Id, JoinState, Testnet, ID_BITS};

fn ids(count: usize) -> Vec<Id> {
    (0..count)
        .map(|i| Id::hash(format!("node-{}", i)))
        .collect()
}

/// The first id at or after `target` walking clockwise.
fn expected_successor(ring: &[Id], target: &Id) -> Id {
    let mut sorted = ring.to_vec();
    sorted.sort();

    sorted
        .iter()
        .find(|id| *id >= target)
        .or_else(|| sorted.first())
        .cloned()
        .unwrap()
}

fn expected_predecessor(ring: &[Id], id: &Id) -> Id {
    let mut sorted = ring.to_vec();
    sorted.sort();

    sorted
        .iter()
        .rev()
        .find(|other| *other < id)
        .or_else(|| sorted.last())
        .cloned()
        .unwrap()
}

fn targets(ring: &[Id]) -> Vec<Id> {
    let mut targets = vec![Id::ZERO, Id([0xff; 20]), Id::power_of_two(159)];

    for id in ring {
        targets.push(*id);
        targets.push(id.wrapping_add(&Id::ONE));
        targets.push(id.wrapping_sub(&Id::ONE));
    }

    targets.extend((0..8).map(|i| Id::hash(format!("target-{}", i))));

    targets
}

#[test]
fn solo_ring() {
    let node = ChordNode::builder().build().unwrap();

    assert_eq!(node.successor(), *node.node());
    assert_eq!(node.predecessor(), *node.node());
    assert_eq!(node.info().join_state(), JoinState::Serving);

    for target in targets(&[*node.id()]) {
        assert_eq!(node.find_successor(&target).unwrap(), *node.node());
    }

    node.shutdown();
}

#[test]
fn id_defaults_to_address_hash() {
    let node = ChordNode::builder().build().unwrap();

    assert_eq!(*node.id(), Id::from_address(&node.local_addr()));

    node.shutdown();
}

#[test]
fn two_nodes() {
    let ring = ids(2);
    let testnet = Testnet::with_ids(&ring).unwrap();

    let a = &testnet.nodes[0];
    let b = &testnet.nodes[1];

    assert_eq!(a.successor(), *b.node());
    assert_eq!(a.predecessor(), *b.node());
    assert_eq!(b.successor(), *a.node());
    assert_eq!(b.predecessor(), *a.node());
}

#[test]
fn find_successor_matches_sorted_ring() {
    let ring = ids(5);
    let testnet = Testnet::with_ids(&ring).unwrap();

    for node in &testnet.nodes {
        for target in targets(&ring) {
            let successor = node.find_successor(&target).unwrap();

            assert_eq!(
                successor.id,
                expected_successor(&ring, &target),
                "find_successor({}) from {}",
                target,
                node.id()
            );
        }
    }
}

#[test]
fn neighbours_and_fingers_are_exact() {
    let ring = ids(5);
    let testnet = Testnet::with_ids(&ring).unwrap();

    for node in &testnet.nodes {
        let info = node.info();

        assert_eq!(info.predecessor().id, expected_predecessor(&ring, node.id()));
        assert_eq!(
            info.successor().id,
            expected_successor(&ring, &node.id().wrapping_add(&Id::ONE))
        );

        assert_eq!(info.fingers().len(), ID_BITS);
        for (index, entry) in info.fingers().iter().enumerate() {
            assert_eq!(*entry.start(), node.id().finger_start(index + 1));
            assert_eq!(
                entry.node().id,
                expected_successor(&ring, entry.start()),
                "finger {} of {}",
                index + 1,
                node.id()
            );
        }
    }
}

#[test]
fn joining_in_ring_order_and_around_zero() {
    // Small ids crowd the ring near zero, every finger start past the last
    // node wraps back to the first one.
    let ring: Vec<Id> = [1000u64, 10, 20, 999, 30]
        .iter()
        .map(|i| Id::from(*i))
        .collect();
    let testnet = Testnet::with_ids(&ring).unwrap();

    for node in &testnet.nodes {
        for target in [0u64, 5, 10, 11, 25, 500, 999, 1000, 1001] {
            let target = Id::from(target);

            assert_eq!(
                node.find_successor(&target).unwrap().id,
                expected_successor(&ring, &target)
            );
        }

        let high = Id([0xff; 20]);
        assert_eq!(node.find_successor(&high).unwrap().id, Id::from(10));
    }
}

#[test]
fn find_predecessor_bounds_the_interval() {
    let ring = ids(4);
    let testnet = Testnet::with_ids(&ring).unwrap();

    let node = &testnet.nodes[2];

    for target in targets(&ring) {
        let predecessor = node.find_predecessor(&target).unwrap();
        let successor = expected_successor(&ring, &predecessor.id.wrapping_add(&Id::ONE));

        assert!(target.in_half_open_right(&predecessor.id, &successor));
    }
}

#[test]
fn closest_preceding_finger_never_overshoots() {
    let ring = ids(4);
    let testnet = Testnet::with_ids(&ring).unwrap();

    for node in &testnet.nodes {
        for target in targets(&ring) {
            let finger = node.closest_preceding_finger(&target);

            if finger.id != *node.id() {
                assert!(finger.id.in_open(node.id(), &target));
                assert!(ring.contains(&finger.id));
            }
        }
    }
}

#[test]
fn duplicate_id_is_rejected() {
    let ring = ids(2);
    let testnet = Testnet::with_ids(&ring).unwrap();

    let result = ChordNode::builder()
        .id(ring[1])
        .bootstrap(testnet.bootstrap)
        .build();

    assert!(matches!(result, Err(chord::Error::InvalidArgument(_))));
}

#[test]
fn testnet_needs_a_node() {
    assert!(matches!(
        Testnet::new(0),
        Err(chord::Error::InvalidArgument(_))
    ));
}

#[test]
fn testnet_with_address_ids() {
    let testnet = Testnet::new(3).unwrap();
    let ring: Vec<Id> = testnet.nodes.iter().map(|node| *node.id()).collect();

    for node in &testnet.nodes {
        let target = Id::random();

        assert_eq!(
            node.find_successor(&target).unwrap().id,
            expected_successor(&ring, &target)
        );
    }
}
