//! Chord node: routing state, join protocol and the public handle.

mod handle_request;
mod info;
mod join;
mod routing;
mod state;

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::common::{Id, Node, RequestSpecific, ResponseSpecific};
use crate::rpc::{Config, Server, Transport};
use crate::{Error, Result, TransportError};

pub use info::Info;
pub use state::JoinState;

use state::NodeState;

#[derive(Debug, Default, Clone)]
/// Chord node builder
pub struct ChordBuilder(Config);

impl ChordBuilder {
    /// Join the ring through the node listening on `bootstrap`.
    pub fn bootstrap(&mut self, bootstrap: SocketAddr) -> &mut Self {
        self.0.bootstrap = Some(bootstrap);

        self
    }

    /// Address to listen on, defaults to `127.0.0.1`.
    pub fn host(&mut self, host: IpAddr) -> &mut Self {
        self.0.host = host;

        self
    }

    /// Explicit port to listen on.
    pub fn port(&mut self, port: u16) -> &mut Self {
        self.0.port = Some(port);

        self
    }

    /// Explicit node id, instead of the hash of the listening address.
    pub fn id(&mut self, id: Id) -> &mut Self {
        self.0.id = Some(id);

        self
    }

    /// Bound on every call to another node.
    pub fn request_timeout(&mut self, request_timeout: Duration) -> &mut Self {
        self.0.request_timeout = request_timeout;

        self
    }

    /// Bound on `find_predecessor` hops.
    pub fn max_lookup_hops(&mut self, max_lookup_hops: usize) -> &mut Self {
        self.0.max_lookup_hops = max_lookup_hops;

        self
    }

    /// Largest frame accepted from a peer.
    pub fn max_frame_size(&mut self, max_frame_size: usize) -> &mut Self {
        self.0.max_frame_size = max_frame_size;

        self
    }

    /// Create a node, start serving and join the ring.
    pub fn build(&self) -> Result<ChordNode> {
        ChordNode::new(self.0.clone())
    }
}

#[derive(Debug)]
pub(crate) struct Inner {
    me: Node,
    transport: Transport,
    max_lookup_hops: usize,
    state: Mutex<NodeState>,
}

impl Inner {
    fn new(me: Node, config: &Config) -> Self {
        Inner {
            state: Mutex::new(NodeState::new(me.clone())),
            me,
            transport: Transport::new(config),
            max_lookup_hops: config.max_lookup_hops,
        }
    }

    /// Lock the routing and key state.
    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
/// Handle to a running Chord node.
///
/// Cloning is cheap, every clone refers to the same node.
pub struct ChordNode {
    inner: Arc<Inner>,
    server: Arc<Server>,
}

impl ChordNode {
    /// Returns a builder to edit settings before creating a node.
    pub fn builder() -> ChordBuilder {
        ChordBuilder::default()
    }

    /// Bind the listener, start serving, then start a new ring or join the one
    /// [Config::bootstrap] belongs to.
    ///
    /// Requests are served from the moment the listener is bound, so peers can
    /// call back into this node while it joins. If the join fails the node is
    /// shut down and the error returned.
    pub fn new(config: Config) -> Result<ChordNode> {
        let listener =
            TcpListener::bind(config.listen_address()).map_err(TransportError::from)?;
        let local_addr = listener.local_addr().map_err(TransportError::from)?;

        let id = config
            .id
            .unwrap_or_else(|| Id::from_address(&local_addr));
        let me = Node::new(id, local_addr);

        let inner = Arc::new(Inner::new(me, &config));
        let server = Server::start(listener, inner.clone(), &config)?;

        let node = ChordNode {
            inner,
            server: Arc::new(server),
        };

        if let Err(error) = node.inner.join(config.bootstrap) {
            node.shutdown();

            return Err(error);
        }

        Ok(node)
    }

    // === Getters ===

    /// This node's [Id]
    pub fn id(&self) -> &Id {
        &self.inner.me.id
    }

    /// Returns the address the server is listening to.
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// This node's endpoint.
    pub fn node(&self) -> &Node {
        &self.inner.me
    }

    /// Returns a snapshot of the routing state.
    pub fn info(&self) -> Info {
        Info::new(&self.inner.state())
    }

    pub fn successor(&self) -> Node {
        self.inner.state().successor().clone()
    }

    pub fn predecessor(&self) -> Node {
        self.inner.state().predecessor.clone()
    }

    /// Returns `true` if `id` falls in the interval this node is responsible for.
    pub fn owns(&self, id: &Id) -> bool {
        self.inner.state().owns(id)
    }

    /// Ids of the keys stored on this node, in ascending order.
    pub fn local_keys(&self) -> Vec<Id> {
        self.inner.state().keys.ids().cloned().collect()
    }

    // === Public Methods ===

    /// Returns the node responsible for `id`.
    pub fn find_successor(&self, id: &Id) -> Result<Node> {
        self.inner.find_successor(id)
    }

    /// Returns the node whose successor is responsible for `id`.
    pub fn find_predecessor(&self, id: &Id) -> Result<Node> {
        self.inner.find_predecessor(id)
    }

    /// Returns the local finger that most closely precedes `id`.
    pub fn closest_preceding_finger(&self, id: &Id) -> Node {
        self.inner
            .state()
            .fingers
            .closest_preceding_finger(id)
            .clone()
    }

    /// Store `keys` on this node, as `populate_keys` does for a remote caller.
    pub fn populate(&self, keys: BTreeMap<Id, Bytes>) -> Result<()> {
        match self.inner.call(&self.inner.me, RequestSpecific::PopulateKeys { keys })? {
            ResponseSpecific::Ack => Ok(()),
            other => Err(TransportError::UnexpectedMessage(format!("{:?}", other)).into()),
        }
    }

    /// Fetch the value stored under `id` from the node responsible for it.
    pub fn lookup(&self, id: &Id) -> Result<Bytes> {
        self.inner.lookup(id)
    }

    /// Hash `key` and fetch its value from the node responsible for it.
    pub fn query(&self, key: &str) -> Result<Bytes> {
        self.inner.lookup(&Id::from_key(key))
    }

    /// Stop accepting connections.
    ///
    /// Peers still pointing at this node will fail to reach it, there is no
    /// graceful departure from the ring.
    pub fn shutdown(&self) {
        self.server.shutdown();

        info!(id = %self.inner.me.id, "Chord node shut down");
    }
}

#[derive(Debug)]
/// Create a ring of nodes on loopback, for testing.
///
/// Nodes join one after the other through the first one. Dropping the
/// [Testnet] shuts every node down.
pub struct Testnet {
    pub bootstrap: SocketAddr,
    pub nodes: Vec<ChordNode>,
}

impl Testnet {
    /// Create a ring of `count` nodes with ids derived from their addresses.
    pub fn new(count: usize) -> Result<Testnet> {
        Testnet::build((0..count).map(|_| None))
    }

    /// Create a ring with one node per id in `ids`, joining in that order.
    pub fn with_ids(ids: &[Id]) -> Result<Testnet> {
        Testnet::build(ids.iter().map(|id| Some(*id)))
    }

    fn build<I: Iterator<Item = Option<Id>>>(ids: I) -> Result<Testnet> {
        let mut nodes: Vec<ChordNode> = vec![];
        let mut bootstrap = None;

        for id in ids {
            let mut builder = ChordNode::builder();

            if let Some(id) = id {
                builder.id(id);
            }
            if let Some(address) = bootstrap {
                builder.bootstrap(address);
            }

            let node = match builder.build() {
                Ok(node) => node,
                Err(error) => {
                    nodes.iter().for_each(ChordNode::shutdown);

                    return Err(error);
                }
            };

            bootstrap.get_or_insert(node.local_addr());
            nodes.push(node);
        }

        let bootstrap = bootstrap
            .ok_or_else(|| Error::InvalidArgument("a testnet needs at least one node".into()))?;

        Ok(Testnet { bootstrap, nodes })
    }

    /// Returns the node with `id`, if it is part of this testnet.
    pub fn node(&self, id: &Id) -> Option<&ChordNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }
}

impl Drop for Testnet {
    fn drop(&mut self) {
        for node in &self.nodes {
            node.shutdown();
        }
    }
}
