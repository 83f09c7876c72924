use std::net::SocketAddr;

use crate::common::{FingerEntry, Id, Node};

use super::state::{JoinState, NodeState};

/// Snapshot of a node's routing state.
#[derive(Debug, Clone)]
pub struct Info {
    node: Node,
    predecessor: Node,
    fingers: Vec<FingerEntry>,
    keys: usize,
    join_state: JoinState,
}

impl Info {
    /// This node's [Id]
    pub fn id(&self) -> &Id {
        &self.node.id
    }
    /// Local TCP socket address that this node is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.node.address
    }
    pub fn predecessor(&self) -> &Node {
        &self.predecessor
    }
    /// The first finger.
    pub fn successor(&self) -> &Node {
        self.fingers[0].node()
    }
    /// All `m` finger entries, from the first to the last.
    pub fn fingers(&self) -> &[FingerEntry] {
        &self.fingers
    }
    /// Number of keys stored locally.
    pub fn keys(&self) -> usize {
        self.keys
    }
    pub fn join_state(&self) -> JoinState {
        self.join_state
    }
}

impl Info {
    pub(crate) fn new(state: &NodeState) -> Self {
        Self {
            node: state.me().clone(),
            predecessor: state.predecessor.clone(),
            fingers: state.fingers.iter().cloned().collect(),
            keys: state.keys.len(),
            join_state: state.join_state,
        }
    }
}
