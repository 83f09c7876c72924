use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordMessage {
    #[serde(rename = "t")]
    pub transaction_id: u32,

    #[serde(flatten)]
    pub variant: ChordMessageVariant,
}

impl ChordMessage {
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<ChordMessage, serde_bencode::Error> {
        let obj = serde_bencode::from_bytes(bytes.as_ref())?;
        Ok(obj)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_bencode::Error> {
        serde_bencode::to_bytes(self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "y")]
pub enum ChordMessageVariant {
    #[serde(rename = "q")]
    Request(ChordRequestSpecific),

    #[serde(rename = "r")]
    Response(ChordResponseSpecific),

    #[serde(rename = "e")]
    Error(ChordErrorSpecific),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "q")]
pub enum ChordRequestSpecific {
    #[serde(rename = "ping")]
    Ping,

    #[serde(rename = "successor")]
    Successor,

    #[serde(rename = "find_successor")]
    FindSuccessor {
        #[serde(rename = "a")]
        arguments: ChordIdArguments,
    },

    #[serde(rename = "closest_preceding_finger")]
    ClosestPrecedingFinger {
        #[serde(rename = "a")]
        arguments: ChordIdArguments,
    },

    #[serde(rename = "get_predecessor")]
    GetPredecessor,

    #[serde(rename = "set_predecessor")]
    SetPredecessor {
        #[serde(rename = "a")]
        arguments: ChordNodeArguments,
    },

    #[serde(rename = "update_finger_table")]
    UpdateFingerTable {
        #[serde(rename = "a")]
        arguments: ChordUpdateFingerTableArguments,
    },

    #[serde(rename = "populate_keys")]
    PopulateKeys {
        #[serde(rename = "a")]
        arguments: ChordKeysArguments,
    },

    #[serde(rename = "get_keys_from_successor")]
    GetKeysFromSuccessor {
        #[serde(rename = "a")]
        arguments: ChordIdArguments,
    },

    #[serde(rename = "query_key")]
    QueryKey {
        #[serde(rename = "a")]
        arguments: ChordQueryKeyArguments,
    },

    #[serde(rename = "get_value_for_key")]
    GetValueForKey {
        #[serde(rename = "a")]
        arguments: ChordIdArguments,
    },
}

/// Only the method name of a request, to tell an unknown method apart from a
/// garbled message.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChordRequestProbe {
    #[serde(rename = "t")]
    pub transaction_id: u32,

    #[serde(rename = "y")]
    pub message_type: ByteBuf,

    #[serde(rename = "q")]
    pub method: ByteBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordResponseSpecific {
    #[serde(rename = "r")]
    pub arguments: ChordResponseArguments,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordErrorSpecific {
    #[serde(rename = "e")]
    pub error_info: (i32, String),
}

// === Request arguments ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordIdArguments {
    #[serde(with = "serde_bytes")]
    pub id: [u8; 20],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordNodeArguments {
    /// Compact node: 20 bytes id followed by the compact socket address.
    #[serde(with = "serde_bytes")]
    pub node: Box<[u8]>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordUpdateFingerTableArguments {
    #[serde(with = "serde_bytes")]
    pub node: Box<[u8]>,

    #[serde(rename = "i")]
    pub index: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordKeysArguments {
    #[serde(rename = "k")]
    pub keys: Vec<ChordKeyRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordQueryKeyArguments {
    #[serde(with = "serde_bytes")]
    pub key: Box<[u8]>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChordKeyRecord {
    #[serde(with = "serde_bytes")]
    pub id: [u8; 20],

    #[serde(with = "serde_bytes")]
    pub v: Box<[u8]>,
}

// === Response arguments ===

/// Responses are not tagged with their method, the caller knows what it asked
/// for. Which field is present decides the variant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ChordResponseArguments {
    /// Compact node answering successor, predecessor and routing queries.
    #[serde(with = "serde_bytes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<Box<[u8]>>,

    /// Compact node to propagate a finger table update to.
    #[serde(with = "serde_bytes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<Box<[u8]>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<Vec<ChordKeyRecord>>,

    #[serde(with = "serde_bytes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<Box<[u8]>>,
}
