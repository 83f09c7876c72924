//! Struct and implementation of the Node endpoint stored in finger tables
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

use crate::common::Id;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Endpoint of a Chord node: its Id and the address it serves RPCs on.
///
/// A plain value used to reach a peer, wherever the successor, predecessor or
/// a finger target is stored.
pub struct Node {
    pub id: Id,
    pub address: SocketAddr,
}

impl Node {
    /// Creates a new Node from an id and socket address.
    pub fn new(id: Id, address: SocketAddr) -> Node {
        Node { id, address }
    }

    /// Creates a Node whose id is derived from its address.
    pub fn from_address(address: SocketAddr) -> Node {
        Node {
            id: Id::from_address(&address),
            address,
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}
