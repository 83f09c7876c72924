//! Chord node Id or key identifier, an integer in `[0, 2^m)`.
use rand::Rng;
use sha1_smol::Sha1;
use std::{
    convert::TryInto,
    fmt::{self, Debug, Display, Formatter},
    net::SocketAddr,
    str::FromStr,
};

use crate::{Error, Result};

/// The size of node IDs in bytes.
pub const ID_SIZE: usize = 20;
/// `m`, the number of bits in the identifier space and the number of fingers.
pub const ID_BITS: usize = ID_SIZE * 8;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash, Default)]
/// Chord node Id or key identifier.
///
/// Stored as big-endian bytes, so the derived ordering is the numeric
/// ordering on the ring.
pub struct Id(pub [u8; ID_SIZE]);

impl Id {
    pub const ZERO: Id = Id([0; ID_SIZE]);
    pub const ONE: Id = Id([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; 20] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE](crate::common::ID_SIZE).
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id> {
        let bytes = bytes.as_ref();
        let bytes: [u8; ID_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::InvalidIdSize(bytes.len()))?;

        Ok(Id(bytes))
    }

    /// SHA-1 of `bytes` interpreted as an unsigned integer.
    pub fn hash<T: AsRef<[u8]>>(bytes: T) -> Id {
        let mut hasher = Sha1::new();
        hasher.update(bytes.as_ref());

        Id(hasher.digest().bytes())
    }

    /// NodeId of a node listening on `address`: the hash of `"host/port"`.
    pub fn from_address(address: &SocketAddr) -> Id {
        Id::hash(format!("{}/{}", address.ip(), address.port()))
    }

    /// KeyId of a key in its natural string form.
    pub fn from_key(key: &str) -> Id {
        Id::hash(key)
    }

    /// `2^exp mod 2^m`.
    pub fn power_of_two(exp: usize) -> Id {
        let mut bytes = [0; ID_SIZE];

        if exp < ID_BITS {
            bytes[ID_SIZE - 1 - exp / 8] = 1 << (exp % 8);
        }

        Id(bytes)
    }

    /// `(self + other) mod 2^m`
    pub fn wrapping_add(&self, other: &Id) -> Id {
        let mut bytes = [0; ID_SIZE];
        let mut carry = 0u16;

        for i in (0..ID_SIZE).rev() {
            let sum = self.0[i] as u16 + other.0[i] as u16 + carry;
            bytes[i] = sum as u8;
            carry = sum >> 8;
        }

        Id(bytes)
    }

    /// `(self - other) mod 2^m`
    pub fn wrapping_sub(&self, other: &Id) -> Id {
        let mut bytes = [0; ID_SIZE];
        let mut borrow = 0i16;

        for i in (0..ID_SIZE).rev() {
            let mut difference = self.0[i] as i16 - other.0[i] as i16 - borrow;
            borrow = 0;
            if difference < 0 {
                difference += 256;
                borrow = 1;
            }
            bytes[i] = difference as u8;
        }

        Id(bytes)
    }

    /// Start of the `k`-th finger interval: `(self + 2^(k-1)) mod 2^m`, for `k` in `1..=m`.
    pub fn finger_start(&self, k: usize) -> Id {
        self.wrapping_add(&Id::power_of_two(k - 1))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        let mut bytes = [0; ID_SIZE];
        bytes[ID_SIZE - 8..].copy_from_slice(&value.to_be_bytes());

        Id(bytes)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = Error;

    /// Parse a 40 character hex string.
    fn from_str(s: &str) -> Result<Id> {
        if s.len() != ID_SIZE * 2 {
            return Err(Error::InvalidIdSize(s.len() / 2));
        }

        let mut bytes = [0; ID_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = s
                .get(i * 2..i * 2 + 2)
                .ok_or_else(|| Error::InvalidArgument(format!("Invalid hex Id: {}", s)))?;
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| Error::InvalidArgument(format!("Invalid hex Id: {}", s)))?;
        }

        Ok(Id(bytes))
    }
}
