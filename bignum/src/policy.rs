//! Range policy for the N carried by entries and announcements.

use factorn_types::{MAX_SCRIPT_ELEMENT_SIZE, MIN_DEADPOOL_INTEGER_BITS};
use num_bigint::BigUint;

use crate::{decode_canonical, BignumError};

/// Largest accepted N, in bits: a full 520-byte element. The encoding is
/// unsigned, so no bit of the top byte is reserved for a sign and the limit
/// is 4160 rather than the 4159 a sign-magnitude encoding would allow.
pub const MAX_DEADPOOL_INTEGER_BITS: u64 = (MAX_SCRIPT_ELEMENT_SIZE as u64) * 8;

/// Decode an encoded N and check it is a plausible bounty target.
pub fn check_deadpool_integer(bytes: &[u8]) -> Result<BigUint, BignumError> {
    if bytes.is_empty() {
        return Err(BignumError::Empty);
    }
    let n = decode_canonical(bytes)?;
    let bits = n.bits();
    if bits < MIN_DEADPOOL_INTEGER_BITS {
        return Err(BignumError::TooSmall {
            bits,
            min: MIN_DEADPOOL_INTEGER_BITS,
        });
    }
    if bits > MAX_DEADPOOL_INTEGER_BITS {
        return Err(BignumError::TooLarge {
            bits,
            max: MAX_DEADPOOL_INTEGER_BITS,
        });
    }
    Ok(n)
}
