//! Identifier newtypes used throughout the simulator.
//!
//! `BlockId` is the chameleon-hash digest itself (a residue mod the group's
//! prime `p`), so that `Block::id = ChameleonHash(..)` (Invariant A) holds
//! without an extra hashing indirection. `MessageDigest` is the plain
//! SHA-256 digest `m` that gets folded into the chameleon hash, wrapped as
//! a fixed-size newtype the same way the other hash-like IDs here are.

use num_bigint::BigUint;
use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A block's chameleon-hash digest. Mutable only through `RedactionEngine`'s
/// trapdoor forge, which recomputes it from a new randomness but keeps the
/// numeric value unchanged (that is the entire point of the trapdoor).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Default)]
pub struct BlockId(pub BigUint);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_str_radix(16))
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = BigUint::parse_bytes(s.as_bytes(), 16)
            .ok_or_else(|| DeError::custom("invalid BlockId hex"))?;
        Ok(BlockId(value))
    }
}

/// The plain SHA-256 digest `m` folded into the chameleon hash: `m =
/// SHA256(canonical(transactions, previous))`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct MessageDigest(pub [u8; 32]);

impl MessageDigest {
    pub fn hash(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data.as_ref());
        let digest: [u8; 32] = hasher.finalize().into();
        MessageDigest(digest)
    }

    /// Interprets the digest as a big-endian unsigned integer, the
    /// representation the chameleon hash's exponent arithmetic operates on.
    pub fn to_biguint(self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

impl fmt::Display for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A simulated node's identity.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A deployed smart-contract's address, allocated from a monotonically
/// increasing counter (see `ledgerlab_node::contracts`).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct ContractAddress(pub u64);

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0xcontract{:08x}", self.0)
    }
}

/// A redaction request's identifier. `spec.md` §3 calls for a "fresh uuid".
pub type RequestId = uuid::Uuid;
