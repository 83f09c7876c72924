//! Mutable routing and storage state of a node, guarded by a single lock.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use bytes::Bytes;

use crate::common::{ring, FingerTable, Id, KeyStore, Node};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Progress of a node through the join protocol.
pub enum JoinState {
    /// Listening, but not yet part of a ring.
    Bootstrapping,
    /// Learning fingers from the reference node.
    InitializingFingerTable,
    /// Announcing itself to the nodes that should point at it.
    PropagatingToOthers,
    /// Taking over keys from the successor.
    TransferringKeys,
    /// Fully joined.
    Serving,
}

impl Display for JoinState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinState::Bootstrapping => "bootstrapping",
            JoinState::InitializingFingerTable => "initializing_finger_table",
            JoinState::PropagatingToOthers => "propagating_to_others",
            JoinState::TransferringKeys => "transferring_keys",
            JoinState::Serving => "serving",
        };

        f.write_str(name)
    }
}

#[derive(Debug)]
pub(crate) struct NodeState {
    pub fingers: FingerTable,
    pub predecessor: Node,
    pub keys: KeyStore,
    pub join_state: JoinState,
}

impl NodeState {
    /// State of a node alone on its ring: every finger and the predecessor
    /// point back at `me`.
    pub fn new(me: Node) -> Self {
        NodeState {
            fingers: FingerTable::new(me.clone()),
            predecessor: me,
            keys: KeyStore::new(),
            join_state: JoinState::Bootstrapping,
        }
    }

    pub fn me(&self) -> &Node {
        self.fingers.owner()
    }

    pub fn successor(&self) -> &Node {
        self.fingers.successor()
    }

    /// Returns `true` if this node is responsible for `id`, that is
    /// `id ∈ (predecessor, me]`.
    pub fn owns(&self, id: &Id) -> bool {
        id.in_half_open_right(&self.predecessor.id, &self.me().id)
    }

    /// Offer `node` as the `index`-th finger.
    ///
    /// The finger is replaced when `node` lies in `[finger.start, finger.node)`
    /// and is not this node. On replacement the predecessor is returned, so the
    /// caller can carry the update further counter-clockwise.
    pub fn update_finger(&mut self, node: Node, index: usize) -> Result<Option<Node>> {
        let entry = self.fingers.entry(index)?;

        let improves = ring::contains(&node.id, entry.start(), &entry.node().id);

        if node.id == self.me().id || !improves {
            return Ok(None);
        }

        self.fingers.set_node(index, node)?;

        Ok(Some(self.predecessor.clone()))
    }

    /// Set the `index`-th finger to `node`, found by a join step, unless an
    /// update that arrived meanwhile already holds a closer node.
    ///
    /// The current finger is kept when it lies in `[finger.start, node)` and
    /// is not this node, the same rule [NodeState::update_finger] applies.
    pub fn merge_finger(&mut self, node: Node, index: usize) -> Result<bool> {
        let entry = self.fingers.entry(index)?;
        let current = entry.node();

        if current.id != self.me().id && ring::contains(&current.id, entry.start(), &node.id) {
            return Ok(false);
        }

        self.fingers.set_node(index, node)?;

        Ok(true)
    }

    /// Removes and returns the keys a new predecessor with `id` takes over,
    /// every key outside of `(id, me]`.
    pub fn extract_keys_for(&mut self, id: &Id) -> BTreeMap<Id, Bytes> {
        let me = self.me().id;

        self.keys
            .extract_matching(|key| !key.in_half_open_right(id, &me))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    fn node(id: u64) -> Node {
        let address: SocketAddr = format!("127.0.0.1:{}", 1000 + id % 60000)
            .parse()
            .unwrap();

        Node::new(Id::from(id), address)
    }

    fn value(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn alone_on_the_ring() {
        let state = NodeState::new(node(10));

        assert_eq!(state.successor(), &node(10));
        assert_eq!(state.predecessor, node(10));
        assert_eq!(state.join_state, JoinState::Bootstrapping);
        assert!(state.fingers.iter().all(|entry| entry.node() == &node(10)));

        // Alone, the node owns the whole ring.
        assert!(state.owns(&Id::from(10)));
        assert!(state.owns(&Id::from(11)));
        assert!(state.owns(&Id::ZERO));
    }

    #[test]
    fn owns_interval() {
        let mut state = NodeState::new(node(10));
        state.predecessor = node(5);

        assert!(!state.owns(&Id::from(5)));
        assert!(state.owns(&Id::from(6)));
        assert!(state.owns(&Id::from(10)));
        assert!(!state.owns(&Id::from(11)));
    }

    #[test]
    fn update_finger_replaces_closer_node() {
        let mut state = NodeState::new(node(10));
        state.predecessor = node(30);
        state.fingers.set_node(2, node(30)).unwrap();

        // finger[2].start is 12, and 20 ∈ [12, 30)
        let propagate = state.update_finger(node(20), 2).unwrap();

        assert_eq!(propagate, Some(node(30)));
        assert_eq!(state.fingers.entry(2).unwrap().node(), &node(20));
    }

    #[test]
    fn update_finger_keeps_closer_finger() {
        let mut state = NodeState::new(node(10));
        state.predecessor = node(30);
        state.fingers.set_node(2, node(20)).unwrap();

        assert_eq!(state.update_finger(node(25), 2).unwrap(), None);
        assert_eq!(state.update_finger(node(20), 2).unwrap(), None);
        assert_eq!(state.fingers.entry(2).unwrap().node(), &node(20));
    }

    #[test]
    fn update_finger_ignores_self() {
        let mut state = NodeState::new(node(10));
        state.fingers.set_node(3, node(40)).unwrap();

        assert_eq!(state.update_finger(node(10), 3).unwrap(), None);
        assert_eq!(state.fingers.entry(3).unwrap().node(), &node(40));
    }

    #[test]
    fn update_finger_on_single_node_ring() {
        let mut state = NodeState::new(node(10));

        // finger[3] starts at 14, finger[5] at 26 which is already past 20.
        assert_eq!(state.update_finger(node(20), 3).unwrap(), Some(node(10)));
        assert_eq!(state.update_finger(node(20), 5).unwrap(), None);

        assert_eq!(state.fingers.entry(3).unwrap().node(), &node(20));
        assert_eq!(state.fingers.entry(5).unwrap().node(), &node(10));
    }

    #[test]
    fn update_finger_at_its_start() {
        let mut state = NodeState::new(node(10));
        state.fingers.set_node(3, node(14)).unwrap();

        // [14, 14) is empty, a finger sitting on its start is already exact.
        assert_eq!(state.update_finger(node(12), 3).unwrap(), None);
        assert_eq!(state.fingers.entry(3).unwrap().node(), &node(14));
    }

    #[test]
    fn update_finger_invalid_index() {
        let mut state = NodeState::new(node(10));

        assert!(matches!(
            state.update_finger(node(20), 0),
            Err(crate::Error::InvalidArgument(_))
        ));
        assert!(matches!(
            state.update_finger(node(20), 161),
            Err(crate::Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn merge_finger_keeps_closer_update() {
        let mut state = NodeState::new(node(10));

        // finger[5] starts at 26, an update already pointed it at 30.
        assert_eq!(state.update_finger(node(30), 5).unwrap(), Some(node(10)));

        assert!(!state.merge_finger(node(40), 5).unwrap());
        assert_eq!(state.fingers.entry(5).unwrap().node(), &node(30));

        assert!(state.merge_finger(node(28), 5).unwrap());
        assert_eq!(state.fingers.entry(5).unwrap().node(), &node(28));
    }

    #[test]
    fn merge_finger_replaces_self() {
        let mut state = NodeState::new(node(10));

        assert!(state.merge_finger(node(40), 5).unwrap());
        assert_eq!(state.fingers.entry(5).unwrap().node(), &node(40));

        // A finger past the start is replaced by the exact node on it.
        assert!(state.merge_finger(node(26), 5).unwrap());
        assert_eq!(state.fingers.entry(5).unwrap().node(), &node(26));
    }

    #[test]
    fn extract_keys_for_new_predecessor() {
        let mut state = NodeState::new(node(10));
        state.predecessor = node(2);
        state.keys.extend(vec![
            (Id::from(3), value("a")),
            (Id::from(5), value("b")),
            (Id::from(7), value("c")),
            (Id::from(10), value("d")),
        ]);

        let extracted = state.extract_keys_for(&Id::from(5));

        assert_eq!(
            extracted.keys().cloned().collect::<Vec<_>>(),
            vec![Id::from(3), Id::from(5)]
        );
        assert_eq!(
            state.keys.ids().cloned().collect::<Vec<_>>(),
            vec![Id::from(7), Id::from(10)]
        );
    }

    #[test]
    fn extract_keys_for_self_keeps_everything() {
        let mut state = NodeState::new(node(10));
        state.keys.insert(Id::from(3), value("a"));

        assert!(state.extract_keys_for(&Id::from(10)).is_empty());
        assert_eq!(state.keys.len(), 1);
    }
}
