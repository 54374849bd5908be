//! Deadpool identifiers: bounty ids and claim hashes.
//!
//! Both are SHA-256 outputs. Construction lives in `factorn-crypto`; this
//! module only carries the values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::hex;
use crate::TypeError;

/// Identifies every entry and announcement that references the same N.
///
/// `SHA256(enc(N))`, displayed byte-reversed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct BountyId([u8; 32]);

impl BountyId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        hex::decode_reversed(s).map(Self)
    }
}

impl fmt::Debug for BountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BountyId({})", &hex::encode_reversed(&self.0)[..8])
    }
}

impl fmt::Display for BountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_reversed(&self.0))
    }
}

/// Commitment binding a revealed factor to one payout script.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ClaimHash([u8; 32]);

impl ClaimHash {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a stack element; `None` unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        hex::decode_reversed(s).map(Self)
    }
}

impl fmt::Debug for ClaimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimHash({})", &hex::encode_reversed(&self.0)[..8])
    }
}

impl fmt::Display for ClaimHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_reversed(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_hash_from_slice_requires_32_bytes() {
        assert!(ClaimHash::from_slice(&[0u8; 31]).is_none());
        assert!(ClaimHash::from_slice(&[0u8; 33]).is_none());
        assert_eq!(ClaimHash::from_slice(&[7u8; 32]), Some(ClaimHash::new([7u8; 32])));
    }

    #[test]
    fn bounty_id_hex_roundtrip() {
        let mut bytes = [0u8; 32];
        bytes[3] = 0x42;
        let id = BountyId::new(bytes);
        assert_eq!(BountyId::from_hex(&id.to_string()), Ok(id));
    }
}
