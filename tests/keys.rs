//! Key placement, transfer on join and lookups.

use std::collections::{BTreeMap, BTreeSet};

use chord::{client::Client, Bytes, ChordNode, Id};

fn value(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn records(count: usize) -> BTreeMap<String, Bytes> {
    (0..count)
        .map(|i| {
            let key = format!("player{}/{}", i, 1950 + i % 50);
            let row = format!("player{},QB,team{},{}", i, i % 7, 1950 + i % 50);

            (key, value(&row))
        })
        .collect()
}

fn by_id(records: &BTreeMap<String, Bytes>) -> BTreeMap<Id, Bytes> {
    records
        .iter()
        .map(|(key, row)| (Id::from_key(key), row.clone()))
        .collect()
}

fn join(id: Id, bootstrap: &ChordNode) -> ChordNode {
    ChordNode::builder()
        .id(id)
        .bootstrap(bootstrap.local_addr())
        .build()
        .unwrap()
}

#[test]
fn end_to_end() {
    let genesis = ChordNode::builder().id(Id::from(1000)).build().unwrap();

    let mut keys = BTreeMap::new();
    keys.insert(Id::from(5), value("a"));
    keys.insert(Id::from(9), value("b"));
    genesis.populate(keys).unwrap();

    assert_eq!(genesis.lookup(&Id::from(5)).unwrap(), value("a"));
    assert_eq!(genesis.lookup(&Id::from(9)).unwrap(), value("b"));

    let joined = join(Id::from(7), &genesis);

    // 7 owns (1000, 7], wrapping through zero.
    assert_eq!(joined.local_keys(), vec![Id::from(5)]);
    assert_eq!(genesis.local_keys(), vec![Id::from(9)]);

    for node in &[&genesis, &joined] {
        assert_eq!(node.lookup(&Id::from(5)).unwrap(), value("a"));
        assert_eq!(node.lookup(&Id::from(9)).unwrap(), value("b"));
    }

    joined.shutdown();
    genesis.shutdown();
}

#[test]
fn transfer_preserves_every_key() {
    let records = records(100);
    let all = by_id(&records);

    let genesis = ChordNode::builder().build().unwrap();
    genesis.populate(all.clone()).unwrap();

    let joined = join(Id::hash("joined"), &genesis);

    let on_genesis: BTreeSet<Id> = genesis.local_keys().into_iter().collect();
    let on_joined: BTreeSet<Id> = joined.local_keys().into_iter().collect();

    assert!(on_genesis.is_disjoint(&on_joined));
    assert_eq!(on_genesis.len() + on_joined.len(), all.len());
    assert_eq!(
        on_genesis.union(&on_joined).cloned().collect::<Vec<_>>(),
        all.keys().cloned().collect::<Vec<_>>()
    );

    assert_eq!(joined.info().keys(), on_joined.len());

    joined.shutdown();
    genesis.shutdown();
}

#[test]
fn every_key_has_exactly_one_owner() {
    let records = records(200);
    let all = by_id(&records);

    let genesis = ChordNode::builder().build().unwrap();
    genesis.populate(all.clone()).unwrap();

    let mut nodes = vec![genesis];
    for i in 0..4 {
        let node = join(Id::hash(format!("node-{}", i)), &nodes[0]);
        nodes.push(node);
    }

    for id in all.keys() {
        let holders: Vec<&ChordNode> = nodes
            .iter()
            .filter(|node| node.local_keys().contains(id))
            .collect();
        let owners: Vec<&ChordNode> = nodes.iter().filter(|node| node.owns(id)).collect();

        assert_eq!(holders.len(), 1, "{} held by {} nodes", id, holders.len());
        assert_eq!(owners.len(), 1);
        assert_eq!(holders[0].id(), owners[0].id());

        // The owner is the node lookups resolve to.
        assert_eq!(nodes[3].find_successor(id).unwrap().id, *owners[0].id());
    }

    let client = Client::default();
    for node in &nodes {
        for (key, row) in records.iter().step_by(17) {
            assert_eq!(client.query_key(node.local_addr(), key).unwrap(), *row);
            assert_eq!(node.query(key).unwrap(), *row);
        }
    }

    for node in &nodes {
        node.shutdown();
    }
}

#[test]
fn populate_merges() {
    let genesis = ChordNode::builder().build().unwrap();

    let mut first = BTreeMap::new();
    first.insert(Id::from_key("a"), value("1"));
    genesis.populate(first).unwrap();

    let mut second = BTreeMap::new();
    second.insert(Id::from_key("b"), value("2"));
    Client::default()
        .populate_keys(genesis.local_addr(), second)
        .unwrap();

    assert_eq!(genesis.info().keys(), 2);
    assert_eq!(genesis.query("a").unwrap(), value("1"));
    assert_eq!(genesis.query("b").unwrap(), value("2"));

    genesis.shutdown();
}

#[test]
fn client_ping_and_find_successor() {
    let genesis = ChordNode::builder().id(Id::from(100)).build().unwrap();
    let other = join(Id::from(200), &genesis);

    let client = Client::default();

    assert_eq!(client.ping(other.local_addr()).unwrap(), *other.node());
    assert_eq!(
        client
            .find_successor(genesis.local_addr(), Id::from(150))
            .unwrap(),
        *other.node()
    );
    assert_eq!(
        client
            .find_successor(other.local_addr(), Id::from(201))
            .unwrap(),
        *genesis.node()
    );

    other.shutdown();
    genesis.shutdown();
}
