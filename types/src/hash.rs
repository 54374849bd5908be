//! 256-bit hash types and the shared hex conventions.
//!
//! All 256-bit values are stored in internal (hash output) byte order and
//! displayed byte-reversed, matching the ledger's txid convention.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// A 32-byte transaction id (double SHA-256 of the serialized transaction).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TxId([u8; 32]);

impl TxId {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from the byte-reversed display form.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        hex::decode_reversed(s).map(Self)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &hex::encode_reversed(&self.0)[..8])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_reversed(&self.0))
    }
}

// Inline hex helpers to keep `types` free of the `hex` crate.
pub(crate) mod hex {
    use crate::TypeError;

    pub fn encode_reversed(bytes: &[u8; 32]) -> String {
        bytes.iter().rev().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode_reversed(s: &str) -> Result<[u8; 32], TypeError> {
        if s.len() != 64 {
            return Err(TypeError::InvalidLength {
                expected: 64,
                actual: s.len(),
            });
        }
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = nibble(chunk[0])?;
            let lo = nibble(chunk[1])?;
            out[31 - i] = (hi << 4) | lo;
        }
        Ok(out)
    }

    fn nibble(c: u8) -> Result<u8, TypeError> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(TypeError::InvalidHex(c as char)),
        }
    }
}
