//! Canonical big-integer codec for deadpool scripts.
//!
//! Every deadpool integer (the semiprime N and any revealed factor) travels
//! through scripts and hashes in one encoding: unsigned, little-endian,
//! minimal length. Zero is the empty byte string and a trailing (most
//! significant) zero byte is never canonical. Bounty ids and claim hashes are
//! computed over exactly these bytes, so this module is the single source of
//! truth for them.

pub mod error;
pub mod policy;

pub use error::BignumError;
pub use num_bigint::BigUint;
pub use policy::check_deadpool_integer;

use num_traits::{One, Zero};

/// Minimal little-endian encoding. Zero encodes as `[]`.
pub fn encode(n: &BigUint) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    n.to_bytes_le()
}

/// Decode, rejecting any non-minimal encoding.
pub fn decode_canonical(bytes: &[u8]) -> Result<BigUint, BignumError> {
    if !is_canonical(bytes) {
        return Err(BignumError::MalformedInteger);
    }
    Ok(BigUint::from_bytes_le(bytes))
}

/// Decode without the minimality check. Display and diagnostics only.
pub fn decode_lenient(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

pub fn is_canonical(bytes: &[u8]) -> bool {
    bytes.last().map_or(true, |&b| b != 0)
}

/// Parse a base-10 string. Leading zeros and signs are rejected.
pub fn from_decimal(s: &str) -> Result<BigUint, BignumError> {
    let bad = || BignumError::InvalidDecimal(s.to_string());
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(bad());
    }
    BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(bad)
}

pub fn to_decimal(n: &BigUint) -> String {
    n.to_str_radix(10)
}

/// Number of significant bits (zero has none).
pub fn bits(n: &BigUint) -> u64 {
    n.bits()
}

/// Exact division check used by the divisor primitive.
///
/// Returns the quotient when `1 < factor < n` and `factor` divides `n`.
pub fn proper_quotient(n: &BigUint, factor: &BigUint) -> Option<BigUint> {
    if factor <= &BigUint::one() || factor >= n {
        return None;
    }
    if !(n % factor).is_zero() {
        return None;
    }
    Some(n / factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_empty() {
        assert!(encode(&BigUint::zero()).is_empty());
        assert_eq!(decode_canonical(&[]).unwrap(), BigUint::zero());
    }

    #[test]
    fn encoding_is_little_endian() {
        assert_eq!(encode(&BigUint::from(0x0102u32)), vec![0x02, 0x01]);
        assert_eq!(encode(&BigUint::from(0x80u32)), vec![0x80]);
    }

    #[test]
    fn trailing_zero_is_malformed() {
        assert_eq!(decode_canonical(&[0x02, 0x00]), Err(BignumError::MalformedInteger));
        assert_eq!(decode_canonical(&[0x00]), Err(BignumError::MalformedInteger));
        assert_eq!(decode_lenient(&[0x02, 0x00]), BigUint::from(2u32));
    }

    #[test]
    fn decimal_roundtrip_and_rejects() {
        let n = from_decimal("1000000000000000000000007").unwrap();
        assert_eq!(to_decimal(&n), "1000000000000000000000007");
        assert!(from_decimal("").is_err());
        assert!(from_decimal("007").is_err());
        assert!(from_decimal("-5").is_err());
        assert!(from_decimal("12a").is_err());
        assert_eq!(from_decimal("0").unwrap(), BigUint::zero());
    }

    #[test]
    fn proper_quotient_bounds() {
        let n = BigUint::from(15u32);
        assert_eq!(proper_quotient(&n, &BigUint::from(3u32)), Some(BigUint::from(5u32)));
        assert_eq!(proper_quotient(&n, &BigUint::from(5u32)), Some(BigUint::from(3u32)));
        assert_eq!(proper_quotient(&n, &BigUint::from(1u32)), None);
        assert_eq!(proper_quotient(&n, &BigUint::from(15u32)), None);
        assert_eq!(proper_quotient(&n, &BigUint::from(4u32)), None);
        assert_eq!(proper_quotient(&n, &BigUint::zero()), None);
        assert_eq!(proper_quotient(&n, &BigUint::from(30u32)), None);
    }
}
