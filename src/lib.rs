#![doc = include_str!("../README.md")]

// Public modules
mod chord;
pub mod client;
mod common;
mod error;
pub mod rpc;

pub use crate::chord::{ChordBuilder, ChordNode, Info, JoinState, Testnet};
pub use crate::common::{
    messages, ring, FingerEntry, FingerTable, Id, KeyStore, Node, ID_BITS, ID_SIZE,
};
pub use crate::error::{Error, Result, TransportError};
pub use bytes::Bytes;
