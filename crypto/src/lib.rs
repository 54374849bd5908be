//! Hashing for the FactorN deadpool.
//!
//! - **SHA-256** and double SHA-256 for transaction-level hashing
//! - **Bounty ids**: `SHA256(enc(N))`
//! - **Claim hashes**: `SHA256(SHA256(enc(factor)) ++ SHA256(destination))`

pub mod hash;

pub use hash::{
    bounty_id, bounty_id_from_decimal, bounty_id_from_encoded, claim_hash, sha256, sha256_multi,
    sha256d,
};
