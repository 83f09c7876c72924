//! Serialize and deserialize Chord RPC messages.

mod internal;

use std::collections::BTreeMap;
use std::convert::TryInto;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;

use crate::common::{Id, Node, ID_SIZE};
use crate::{Error, Result, TransportError};

/// Names of every method a node serves, as they appear on the wire.
pub const METHODS: [&str; 11] = [
    "ping",
    "successor",
    "find_successor",
    "closest_preceding_finger",
    "get_predecessor",
    "set_predecessor",
    "update_finger_table",
    "populate_keys",
    "get_keys_from_successor",
    "query_key",
    "get_value_for_key",
];

#[derive(Debug, PartialEq, Clone)]
pub struct Message {
    /// Echoed by the responder, so the requester can tell a stray frame apart.
    pub transaction_id: u32,

    pub message_type: MessageType,
}

#[derive(Debug, PartialEq, Clone)]
pub enum MessageType {
    Request(RequestSpecific),

    Response(ResponseSpecific),

    Error(ErrorSpecific),
}

#[derive(Debug, PartialEq, Clone)]
pub struct ErrorSpecific {
    pub code: i32,
    pub description: String,
}

#[derive(Debug, PartialEq, Clone)]
pub enum RequestSpecific {
    /// Ask a node for its own endpoint.
    Ping,
    /// The node's current first finger.
    Successor,
    FindSuccessor {
        id: Id,
    },
    ClosestPrecedingFinger {
        id: Id,
    },
    GetPredecessor,
    SetPredecessor {
        node: Node,
    },
    /// Offer `node` as the `index`-th finger of the receiver.
    UpdateFingerTable {
        node: Node,
        index: usize,
    },
    /// Bulk load, used at ring genesis.
    PopulateKeys {
        keys: BTreeMap<Id, Bytes>,
    },
    /// Extract the keys a node with `id` owns now that it precedes the receiver.
    GetKeysFromSuccessor {
        id: Id,
    },
    /// Resolve a raw key on the ring.
    QueryKey {
        key: String,
    },
    GetValueForKey {
        id: Id,
    },
}

impl RequestSpecific {
    /// The method name as it appears on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            RequestSpecific::Ping => "ping",
            RequestSpecific::Successor => "successor",
            RequestSpecific::FindSuccessor { .. } => "find_successor",
            RequestSpecific::ClosestPrecedingFinger { .. } => "closest_preceding_finger",
            RequestSpecific::GetPredecessor => "get_predecessor",
            RequestSpecific::SetPredecessor { .. } => "set_predecessor",
            RequestSpecific::UpdateFingerTable { .. } => "update_finger_table",
            RequestSpecific::PopulateKeys { .. } => "populate_keys",
            RequestSpecific::GetKeysFromSuccessor { .. } => "get_keys_from_successor",
            RequestSpecific::QueryKey { .. } => "query_key",
            RequestSpecific::GetValueForKey { .. } => "get_value_for_key",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum ResponseSpecific {
    /// Request handled, nothing to return.
    Ack,
    Node(Node),
    /// A finger was replaced, continue propagating the update to this node.
    Propagate(Node),
    Keys(BTreeMap<Id, Bytes>),
    Value(Bytes),
}

impl Message {
    fn into_serde_message(self) -> internal::ChordMessage {
        internal::ChordMessage {
            transaction_id: self.transaction_id,
            variant: match self.message_type {
                MessageType::Request(request) => {
                    internal::ChordMessageVariant::Request(match request {
                        RequestSpecific::Ping => internal::ChordRequestSpecific::Ping,
                        RequestSpecific::Successor => internal::ChordRequestSpecific::Successor,
                        RequestSpecific::FindSuccessor { id } => {
                            internal::ChordRequestSpecific::FindSuccessor {
                                arguments: internal::ChordIdArguments { id: id.0 },
                            }
                        }
                        RequestSpecific::ClosestPrecedingFinger { id } => {
                            internal::ChordRequestSpecific::ClosestPrecedingFinger {
                                arguments: internal::ChordIdArguments { id: id.0 },
                            }
                        }
                        RequestSpecific::GetPredecessor => {
                            internal::ChordRequestSpecific::GetPredecessor
                        }
                        RequestSpecific::SetPredecessor { node } => {
                            internal::ChordRequestSpecific::SetPredecessor {
                                arguments: internal::ChordNodeArguments {
                                    node: node_to_bytes(&node).into(),
                                },
                            }
                        }
                        RequestSpecific::UpdateFingerTable { node, index } => {
                            internal::ChordRequestSpecific::UpdateFingerTable {
                                arguments: internal::ChordUpdateFingerTableArguments {
                                    node: node_to_bytes(&node).into(),
                                    index: index as u32,
                                },
                            }
                        }
                        RequestSpecific::PopulateKeys { keys } => {
                            internal::ChordRequestSpecific::PopulateKeys {
                                arguments: internal::ChordKeysArguments {
                                    keys: keys_to_records(keys),
                                },
                            }
                        }
                        RequestSpecific::GetKeysFromSuccessor { id } => {
                            internal::ChordRequestSpecific::GetKeysFromSuccessor {
                                arguments: internal::ChordIdArguments { id: id.0 },
                            }
                        }
                        RequestSpecific::QueryKey { key } => {
                            internal::ChordRequestSpecific::QueryKey {
                                arguments: internal::ChordQueryKeyArguments {
                                    key: key.into_bytes().into(),
                                },
                            }
                        }
                        RequestSpecific::GetValueForKey { id } => {
                            internal::ChordRequestSpecific::GetValueForKey {
                                arguments: internal::ChordIdArguments { id: id.0 },
                            }
                        }
                    })
                }

                MessageType::Response(response) => {
                    let mut arguments = internal::ChordResponseArguments::default();

                    match response {
                        ResponseSpecific::Ack => {}
                        ResponseSpecific::Node(node) => {
                            arguments.n = Some(node_to_bytes(&node).into());
                        }
                        ResponseSpecific::Propagate(node) => {
                            arguments.p = Some(node_to_bytes(&node).into());
                        }
                        ResponseSpecific::Keys(keys) => {
                            arguments.k = Some(keys_to_records(keys));
                        }
                        ResponseSpecific::Value(value) => {
                            arguments.v = Some(value.to_vec().into());
                        }
                    }

                    internal::ChordMessageVariant::Response(internal::ChordResponseSpecific {
                        arguments,
                    })
                }

                MessageType::Error(err) => {
                    internal::ChordMessageVariant::Error(internal::ChordErrorSpecific {
                        error_info: (err.code, err.description),
                    })
                }
            },
        }
    }

    fn from_serde_message(msg: internal::ChordMessage) -> Result<Message> {
        Ok(Message {
            transaction_id: msg.transaction_id,
            message_type: match msg.variant {
                internal::ChordMessageVariant::Request(request) => {
                    MessageType::Request(match request {
                        internal::ChordRequestSpecific::Ping => RequestSpecific::Ping,
                        internal::ChordRequestSpecific::Successor => RequestSpecific::Successor,
                        internal::ChordRequestSpecific::FindSuccessor { arguments } => {
                            RequestSpecific::FindSuccessor {
                                id: Id(arguments.id),
                            }
                        }
                        internal::ChordRequestSpecific::ClosestPrecedingFinger { arguments } => {
                            RequestSpecific::ClosestPrecedingFinger {
                                id: Id(arguments.id),
                            }
                        }
                        internal::ChordRequestSpecific::GetPredecessor => {
                            RequestSpecific::GetPredecessor
                        }
                        internal::ChordRequestSpecific::SetPredecessor { arguments } => {
                            RequestSpecific::SetPredecessor {
                                node: bytes_to_node(&arguments.node)?,
                            }
                        }
                        internal::ChordRequestSpecific::UpdateFingerTable { arguments } => {
                            RequestSpecific::UpdateFingerTable {
                                node: bytes_to_node(&arguments.node)?,
                                index: arguments.index as usize,
                            }
                        }
                        internal::ChordRequestSpecific::PopulateKeys { arguments } => {
                            RequestSpecific::PopulateKeys {
                                keys: records_to_keys(arguments.keys),
                            }
                        }
                        internal::ChordRequestSpecific::GetKeysFromSuccessor { arguments } => {
                            RequestSpecific::GetKeysFromSuccessor {
                                id: Id(arguments.id),
                            }
                        }
                        internal::ChordRequestSpecific::QueryKey { arguments } => {
                            RequestSpecific::QueryKey {
                                key: String::from_utf8(arguments.key.into()).map_err(|_| {
                                    Error::InvalidArgument("query key is not valid utf-8".into())
                                })?,
                            }
                        }
                        internal::ChordRequestSpecific::GetValueForKey { arguments } => {
                            RequestSpecific::GetValueForKey {
                                id: Id(arguments.id),
                            }
                        }
                    })
                }

                internal::ChordMessageVariant::Response(internal::ChordResponseSpecific {
                    arguments,
                }) => MessageType::Response(if let Some(node) = arguments.n {
                    ResponseSpecific::Node(bytes_to_node(&node)?)
                } else if let Some(node) = arguments.p {
                    ResponseSpecific::Propagate(bytes_to_node(&node)?)
                } else if let Some(records) = arguments.k {
                    ResponseSpecific::Keys(records_to_keys(records))
                } else if let Some(value) = arguments.v {
                    ResponseSpecific::Value(Bytes::from(value.into_vec()))
                } else {
                    ResponseSpecific::Ack
                }),

                internal::ChordMessageVariant::Error(err) => MessageType::Error(ErrorSpecific {
                    code: err.error_info.0,
                    description: err.error_info.1,
                }),
            },
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self
            .clone()
            .into_serde_message()
            .to_bytes()
            .map_err(TransportError::from)?)
    }

    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Message> {
        let message =
            internal::ChordMessage::from_bytes(bytes).map_err(TransportError::from)?;

        Message::from_serde_message(message)
    }
}

/// If `bytes` is a request for a method this node does not serve, returns its
/// transaction_id and method name.
pub fn unknown_method<T: AsRef<[u8]>>(bytes: T) -> Option<(u32, String)> {
    let probe: internal::ChordRequestProbe = serde_bencode::from_bytes(bytes.as_ref()).ok()?;

    if probe.message_type.as_slice() != b"q" {
        return None;
    }

    let method = String::from_utf8_lossy(&probe.method).into_owned();

    if METHODS.contains(&method.as_str()) {
        return None;
    }

    Some((probe.transaction_id, method))
}

fn bytes_to_sockaddr<T: AsRef<[u8]>>(bytes: T) -> Result<SocketAddr> {
    let bytes = bytes.as_ref();
    match bytes.len() {
        6 => {
            let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
            let port = u16::from_be_bytes([bytes[4], bytes[5]]);

            Ok(SocketAddr::new(IpAddr::V4(ip), port))
        }

        18 => {
            let octets: [u8; 16] = bytes[..16]
                .try_into()
                .map_err(|_| Error::InvalidArgument("wrong number of bytes for ipv6".into()))?;
            let port = u16::from_be_bytes([bytes[16], bytes[17]]);

            Ok(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
        }

        _ => Err(Error::InvalidArgument(
            "Wrong number of bytes for sockaddr".into(),
        )),
    }
}

pub fn sockaddr_to_bytes(sockaddr: &SocketAddr) -> Vec<u8> {
    let mut bytes = Vec::new();

    match sockaddr {
        SocketAddr::V4(v4) => bytes.extend_from_slice(&v4.ip().octets()),
        SocketAddr::V6(v6) => bytes.extend_from_slice(&v6.ip().octets()),
    }

    bytes.extend_from_slice(&sockaddr.port().to_be_bytes());

    bytes
}

fn node_to_bytes(node: &Node) -> Vec<u8> {
    let mut bytes = node.id.to_vec();
    bytes.append(&mut sockaddr_to_bytes(&node.address));
    bytes
}

fn bytes_to_node<T: AsRef<[u8]>>(bytes: T) -> Result<Node> {
    let bytes = bytes.as_ref();

    if bytes.len() < ID_SIZE {
        return Err(Error::InvalidArgument(format!(
            "Wrong number of bytes for node ({})",
            bytes.len()
        )));
    }

    let id = Id::from_bytes(&bytes[..ID_SIZE])?;
    let address = bytes_to_sockaddr(&bytes[ID_SIZE..])?;

    Ok(Node::new(id, address))
}

fn keys_to_records(keys: BTreeMap<Id, Bytes>) -> Vec<internal::ChordKeyRecord> {
    keys.into_iter()
        .map(|(id, value)| internal::ChordKeyRecord {
            id: id.0,
            v: value.to_vec().into(),
        })
        .collect()
}

fn records_to_keys(records: Vec<internal::ChordKeyRecord>) -> BTreeMap<Id, Bytes> {
    records
        .into_iter()
        .map(|record| (Id(record.id), Bytes::from(record.v.into_vec())))
        .collect()
}
