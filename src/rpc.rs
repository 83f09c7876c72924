//! Chord RPC transport: configuration, framing and the listening server.

pub(crate) mod config;
pub(crate) mod server;
pub(crate) mod socket;

pub use config::{Config, DEFAULT_MAX_LOOKUP_HOPS};
pub use server::{ConnectionId, RequestHandler, Server};
pub use socket::{Transport, DEFAULT_MAX_FRAME_SIZE, DEFAULT_REQUEST_TIMEOUT};
