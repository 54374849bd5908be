//! SHA-256 hashing and the two deadpool commitments.

use factorn_bignum::{BigUint, BignumError};
use factorn_types::{BountyId, ClaimHash};
use sha2::{Digest, Sha256};

/// Compute SHA-256 of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 applied twice.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn sha256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// `SHA256(enc(n))`.
pub fn bounty_id(n: &BigUint) -> BountyId {
    BountyId::new(sha256(&factorn_bignum::encode(n)))
}

/// Bounty id from an already-encoded N, as found in a script push.
pub fn bounty_id_from_encoded(n_bytes: &[u8]) -> BountyId {
    BountyId::new(sha256(n_bytes))
}

/// Bounty id for a base-10 N.
pub fn bounty_id_from_decimal(n: &str) -> Result<BountyId, BignumError> {
    factorn_bignum::from_decimal(n).map(|n| bounty_id(&n))
}

/// `SHA256(SHA256(enc(factor)) ++ SHA256(destination))`.
pub fn claim_hash(factor: &BigUint, destination: &[u8]) -> ClaimHash {
    let factor_hash = sha256(&factorn_bignum::encode(factor));
    let script_hash = sha256(destination);
    ClaimHash::new(sha256_multi(&[&factor_hash, &script_hash]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex(&sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha256_multi_matches_concatenation() {
        let joined = sha256(b"helloworld");
        assert_eq!(sha256_multi(&[b"hello", b"world"]), joined);
    }

    #[test]
    fn bounty_id_of_encoded_matches() {
        let n = BigUint::from(0x0102_0304u32);
        assert_eq!(bounty_id(&n), bounty_id_from_encoded(&[0x04, 0x03, 0x02, 0x01]));
        assert_eq!(bounty_id_from_decimal("16909060").unwrap(), bounty_id(&n));
    }

    #[test]
    fn claim_hash_layout() {
        let factor = BigUint::from(7u32);
        let dest = [0x51u8];
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&sha256(&[7]));
        preimage.extend_from_slice(&sha256(&dest));
        assert_eq!(claim_hash(&factor, &dest).as_bytes(), &sha256(&preimage));
    }

    #[test]
    fn claim_hash_is_order_sensitive() {
        // Swapping the roles of factor bytes and script bytes changes the hash.
        let factor = BigUint::from(0x51u32);
        let dest = [0x07u8];
        let swapped = claim_hash(&BigUint::from(7u32), &[0x51]);
        assert_ne!(claim_hash(&factor, &dest), swapped);
    }
}
