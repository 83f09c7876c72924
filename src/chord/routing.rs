//! Finger table routing: successor lookups and typed calls to other nodes.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use bytes::Bytes;
use tracing::trace;

use crate::common::{Id, Node, RequestSpecific, ResponseSpecific};
use crate::rpc::RequestHandler;
use crate::{Error, Result, TransportError};

use super::Inner;

impl Inner {
    /// Send `request` to `node`, serving it in process when `node` is this node.
    pub(super) fn call(&self, node: &Node, request: RequestSpecific) -> Result<ResponseSpecific> {
        if node.id == self.me.id {
            return self.handle_request(request, self.me.address);
        }

        self.transport.request(node.address, request)
    }

    fn call_for_node(&self, node: &Node, request: RequestSpecific) -> Result<Node> {
        let method = request.method();

        match self.call(node, request)? {
            ResponseSpecific::Node(node) => Ok(node),
            other => Err(unexpected(method, other)),
        }
    }

    /// Ask whoever listens on `address` for its endpoint.
    pub(super) fn ping(&self, address: SocketAddr) -> Result<Node> {
        match self.transport.request(address, RequestSpecific::Ping)? {
            ResponseSpecific::Node(node) => Ok(node),
            other => Err(unexpected("ping", other)),
        }
    }

    pub(super) fn successor_of(&self, node: &Node) -> Result<Node> {
        self.call_for_node(node, RequestSpecific::Successor)
    }

    pub(super) fn predecessor_of(&self, node: &Node) -> Result<Node> {
        self.call_for_node(node, RequestSpecific::GetPredecessor)
    }

    pub(super) fn closest_preceding_finger_of(&self, node: &Node, id: &Id) -> Result<Node> {
        self.call_for_node(node, RequestSpecific::ClosestPrecedingFinger { id: *id })
    }

    /// Ask `node` to resolve the successor of `id` on our behalf.
    pub(super) fn find_successor_via(&self, node: &Node, id: &Id) -> Result<Node> {
        self.call_for_node(node, RequestSpecific::FindSuccessor { id: *id })
    }

    pub(super) fn set_predecessor_of(&self, node: &Node, predecessor: Node) -> Result<()> {
        let request = RequestSpecific::SetPredecessor { node: predecessor };

        match self.call(node, request)? {
            ResponseSpecific::Ack => Ok(()),
            other => Err(unexpected("set_predecessor", other)),
        }
    }

    /// Offer `finger` as the `index`-th finger of `node`, returning the node to
    /// continue propagating to if it was accepted.
    pub(super) fn update_finger_table_of(
        &self,
        node: &Node,
        finger: Node,
        index: usize,
    ) -> Result<Option<Node>> {
        let request = RequestSpecific::UpdateFingerTable {
            node: finger,
            index,
        };

        match self.call(node, request)? {
            ResponseSpecific::Ack => Ok(None),
            ResponseSpecific::Propagate(next) => Ok(Some(next)),
            other => Err(unexpected("update_finger_table", other)),
        }
    }

    pub(super) fn keys_from(&self, node: &Node, id: &Id) -> Result<BTreeMap<Id, Bytes>> {
        match self.call(node, RequestSpecific::GetKeysFromSuccessor { id: *id })? {
            ResponseSpecific::Keys(keys) => Ok(keys),
            other => Err(unexpected("get_keys_from_successor", other)),
        }
    }

    pub(super) fn value_from(&self, node: &Node, id: &Id) -> Result<Bytes> {
        match self.call(node, RequestSpecific::GetValueForKey { id: *id })? {
            ResponseSpecific::Value(value) => Ok(value),
            other => Err(unexpected("get_value_for_key", other)),
        }
    }

    /// Returns the node `p` such that `id ∈ (p, successor(p)]`.
    ///
    /// Starts at this node and hops to the closest preceding finger of each
    /// candidate. Every hop halves the remaining distance on a consistent
    /// ring, so a lookup that does not settle within `max_lookup_hops`, or
    /// stops making progress, fails with [Error::LookupExhausted].
    pub(super) fn find_predecessor(&self, id: &Id) -> Result<Node> {
        let mut candidate = self.me.clone();

        for hop in 0..self.max_lookup_hops {
            let successor = self.successor_of(&candidate)?;

            if id.in_half_open_right(&candidate.id, &successor.id) {
                trace!(
                    context = "find_predecessor",
                    target = %id,
                    predecessor = %candidate,
                    hops = hop
                );

                return Ok(candidate);
            }

            let next = self.closest_preceding_finger_of(&candidate, id)?;

            if next.id == candidate.id {
                return Err(Error::LookupExhausted {
                    target: *id,
                    hops: hop + 1,
                });
            }

            candidate = next;
        }

        Err(Error::LookupExhausted {
            target: *id,
            hops: self.max_lookup_hops,
        })
    }

    /// Returns the node responsible for `id`.
    pub(super) fn find_successor(&self, id: &Id) -> Result<Node> {
        let predecessor = self.find_predecessor(id)?;

        self.successor_of(&predecessor)
    }

    /// Fetch the value stored under `id` from the node responsible for it.
    pub(super) fn lookup(&self, id: &Id) -> Result<Bytes> {
        let owner = self.find_successor(id)?;

        trace!(context = "lookup", target = %id, %owner);

        self.value_from(&owner, id)
    }
}

fn unexpected(method: &str, response: ResponseSpecific) -> Error {
    TransportError::UnexpectedMessage(format!("{:?} in response to {}", response, method)).into()
}
