//! The three deadpool script shapes.
//!
//! ```text
//! entry:     <N> OP_CHECKDIVVERIFY OP_DROP OP_ANNOUNCEVERIFY OP_DROP OP_DROP OP_TRUE
//! announce:  OP_ANNOUNCE <claim_hash> <N>
//! claim sig: <claim_hash> <factor>
//! ```

use factorn_bignum::BigUint;
use factorn_types::{BountyId, ClaimHash, Script};

use crate::opcodes::*;
use crate::parse::{instructions, Instruction};
use crate::ScriptBuilder;

/// A locking script recognised as one of the deadpool outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeadpoolScript {
    Entry { n: Vec<u8> },
    Announce { n: Vec<u8>, claim_hash: ClaimHash },
}

impl DeadpoolScript {
    /// Match a locking script against the entry and announce templates exactly.
    pub fn classify(script: &Script) -> Option<Self> {
        let ops: Vec<Instruction<'_>> = instructions(script.as_bytes())
            .collect::<Result<_, _>>()
            .ok()?;
        match ops.as_slice() {
            [Instruction::Push(n), Instruction::Op(OP_CHECKDIVVERIFY), Instruction::Op(OP_DROP), Instruction::Op(OP_ANNOUNCEVERIFY), Instruction::Op(OP_DROP), Instruction::Op(OP_DROP), Instruction::Op(OP_TRUE)] => {
                Some(Self::Entry { n: n.to_vec() })
            }
            [Instruction::Op(OP_ANNOUNCE), Instruction::Push(hash), Instruction::Push(n)] => {
                ClaimHash::from_slice(hash).map(|claim_hash| Self::Announce {
                    n: n.to_vec(),
                    claim_hash,
                })
            }
            _ => None,
        }
    }

    /// Encoded N carried by the script.
    pub fn n(&self) -> &[u8] {
        match self {
            Self::Entry { n } | Self::Announce { n, .. } => n,
        }
    }

    pub fn bounty_id(&self) -> BountyId {
        factorn_crypto::bounty_id_from_encoded(self.n())
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Entry { .. })
    }
}

pub fn entry_script(n: &BigUint) -> Script {
    ScriptBuilder::new()
        .push_slice(&factorn_bignum::encode(n))
        .push_opcode(OP_CHECKDIVVERIFY)
        .push_opcode(OP_DROP)
        .push_opcode(OP_ANNOUNCEVERIFY)
        .push_opcode(OP_DROP)
        .push_opcode(OP_DROP)
        .push_opcode(OP_TRUE)
        .into_script()
}

pub fn announce_script(n: &BigUint, claim_hash: &ClaimHash) -> Script {
    ScriptBuilder::new()
        .push_opcode(OP_ANNOUNCE)
        .push_slice(claim_hash.as_bytes())
        .push_slice(&factorn_bignum::encode(n))
        .into_script()
}

pub fn claim_script_sig(claim_hash: &ClaimHash, factor: &BigUint) -> Script {
    ScriptBuilder::new()
        .push_slice(claim_hash.as_bytes())
        .push_slice(&factorn_bignum::encode(factor))
        .into_script()
}

/// The data revealed by a claiming input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimWitness {
    pub claim_hash: ClaimHash,
    /// Encoded factor exactly as pushed.
    pub factor: Vec<u8>,
}

/// Extract `<claim_hash> <factor>` from an unlocking script.
pub fn parse_claim_script_sig(script: &Script) -> Option<ClaimWitness> {
    let ops: Vec<Instruction<'_>> = instructions(script.as_bytes())
        .collect::<Result<_, _>>()
        .ok()?;
    match ops.as_slice() {
        [Instruction::Push(hash), factor] => {
            let factor = factor.pushed_bytes()?;
            ClaimHash::from_slice(hash).map(|claim_hash| ClaimWitness { claim_hash, factor })
        }
        _ => None,
    }
}

/// Whether the script contains any activation-gated opcode.
pub fn uses_deadpool_opcodes(script: &Script) -> bool {
    instructions(script.as_bytes())
        .map_while(Result::ok)
        .any(|ins| matches!(ins, Instruction::Op(op) if is_deadpool_opcode(op)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n() -> BigUint {
        (BigUint::from(1u32) << 200u32) + 77u32
    }

    #[test]
    fn entry_roundtrips_through_classify() {
        let script = entry_script(&n());
        assert_eq!(
            DeadpoolScript::classify(&script),
            Some(DeadpoolScript::Entry {
                n: factorn_bignum::encode(&n())
            })
        );
        assert!(uses_deadpool_opcodes(&script));
    }

    #[test]
    fn announce_roundtrips_through_classify() {
        let hash = ClaimHash::new([4; 32]);
        let script = announce_script(&n(), &hash);
        let classified = DeadpoolScript::classify(&script).unwrap();
        assert_eq!(
            classified,
            DeadpoolScript::Announce {
                n: factorn_bignum::encode(&n()),
                claim_hash: hash
            }
        );
        assert_eq!(classified.bounty_id(), factorn_crypto::bounty_id(&n()));
    }

    #[test]
    fn near_misses_are_not_templates() {
        let mut bytes = entry_script(&n()).into_bytes();
        bytes.pop();
        assert_eq!(DeadpoolScript::classify(&Script::new(bytes)), None);

        let short_hash = ScriptBuilder::new()
            .push_opcode(OP_ANNOUNCE)
            .push_slice(&[1u8; 31])
            .push_slice(&factorn_bignum::encode(&n()))
            .into_script();
        assert_eq!(DeadpoolScript::classify(&short_hash), None);
        assert_eq!(DeadpoolScript::classify(&Script::new(vec![OP_TRUE])), None);
    }

    #[test]
    fn claim_script_sig_parses() {
        let hash = ClaimHash::new([9; 32]);
        let factor = BigUint::from(1_000_003u32);
        let sig = claim_script_sig(&hash, &factor);
        assert_eq!(
            parse_claim_script_sig(&sig),
            Some(ClaimWitness {
                claim_hash: hash,
                factor: factorn_bignum::encode(&factor)
            })
        );
        assert!(!uses_deadpool_opcodes(&sig));
    }

    #[test]
    fn small_integer_factor_parses() {
        let hash = ClaimHash::new([9; 32]);
        let sig = ScriptBuilder::new()
            .push_slice(hash.as_bytes())
            .push_opcode(OP_1 + 4)
            .into_script();
        assert_eq!(parse_claim_script_sig(&sig).map(|w| w.factor), Some(vec![5]));

        let not_a_push = ScriptBuilder::new()
            .push_slice(hash.as_bytes())
            .push_opcode(OP_DUP)
            .into_script();
        assert_eq!(parse_claim_script_sig(&not_a_push), None);
    }
}
