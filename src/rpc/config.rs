use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::common::{Id, ID_BITS};

use super::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_REQUEST_TIMEOUT};

/// Default bound on `find_predecessor` iterations, twice the number of fingers.
pub const DEFAULT_MAX_LOOKUP_HOPS: usize = ID_BITS * 2;

#[derive(Debug, Clone)]
/// Chord node Configurations
pub struct Config {
    /// An existing node to join the ring through.
    ///
    /// Defaults to None, where this node starts a new ring on its own.
    pub bootstrap: Option<SocketAddr>,
    /// Address to listen on.
    ///
    /// Defaults to `127.0.0.1`
    pub host: IpAddr,
    /// Explicit port to listen on.
    ///
    /// Defaults to None, where the OS assigns a free port.
    pub port: Option<u16>,
    /// Explicit node Id.
    ///
    /// Defaults to None, where the Id is the hash of `"host/port"` of the
    /// listening address.
    pub id: Option<Id>,
    /// Bound on connecting, writing a request and reading its response.
    ///
    /// Defaults to [DEFAULT_REQUEST_TIMEOUT]
    pub request_timeout: Duration,
    /// Bound on `find_predecessor` iterations before the lookup is abandoned.
    ///
    /// Defaults to [DEFAULT_MAX_LOOKUP_HOPS]
    pub max_lookup_hops: usize,
    /// Largest frame accepted from a peer.
    ///
    /// Defaults to [DEFAULT_MAX_FRAME_SIZE]
    pub max_frame_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: None,
            id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_lookup_hops: DEFAULT_MAX_LOOKUP_HOPS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Config {
    /// The address to bind the listener to.
    pub fn listen_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.unwrap_or(0))
    }
}
