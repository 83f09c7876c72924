//! Client for talking to a ring from outside of it.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::common::{Id, Node, RequestSpecific, ResponseSpecific};
use crate::rpc::{Config, Transport};
use crate::{Result, TransportError};

#[derive(Debug)]
/// Sends single requests to a known node, without joining the ring.
pub struct Client {
    transport: Transport,
}

impl Default for Client {
    fn default() -> Self {
        Client::new(&Config::default())
    }
}

impl Client {
    /// Create a client using the timeouts and frame limit of `config`.
    pub fn new(config: &Config) -> Self {
        Client {
            transport: Transport::new(config),
        }
    }

    /// Returns the endpoint of the node listening on `address`.
    pub fn ping(&self, address: SocketAddr) -> Result<Node> {
        match self.transport.request(address, RequestSpecific::Ping)? {
            ResponseSpecific::Node(node) => Ok(node),
            other => Err(unexpected("ping", other)),
        }
    }

    /// Ask the node at `address` for the node responsible for `id`.
    pub fn find_successor(&self, address: SocketAddr, id: Id) -> Result<Node> {
        match self
            .transport
            .request(address, RequestSpecific::FindSuccessor { id })?
        {
            ResponseSpecific::Node(node) => Ok(node),
            other => Err(unexpected("find_successor", other)),
        }
    }

    /// Bulk load `keys` into the node at `address`.
    ///
    /// The node stores every record as is, so this is meant for a ring of a
    /// single node, before any other node joins.
    pub fn populate_keys(&self, address: SocketAddr, keys: BTreeMap<Id, Bytes>) -> Result<()> {
        match self
            .transport
            .request(address, RequestSpecific::PopulateKeys { keys })?
        {
            ResponseSpecific::Ack => Ok(()),
            other => Err(unexpected("populate_keys", other)),
        }
    }

    /// Resolve `key` on the ring the node at `address` belongs to.
    pub fn query_key(&self, address: SocketAddr, key: &str) -> Result<Bytes> {
        let request = RequestSpecific::QueryKey {
            key: key.to_string(),
        };

        match self.transport.request(address, request)? {
            ResponseSpecific::Value(value) => Ok(value),
            other => Err(unexpected("query_key", other)),
        }
    }
}

fn unexpected(method: &str, response: ResponseSpecific) -> crate::Error {
    TransportError::UnexpectedMessage(format!("{:?} in response to {}", response, method)).into()
}
