//! Evaluation of one spending input.
//!
//! The unlocking script runs first, then the locking script on the same
//! stack. Evaluation is pure: the announcement set is only read through the
//! [`AnnouncementSnapshot`] pinned to the validation height.

use factorn_bignum::BigUint;
use factorn_store::{AnnouncementRecord, AnnouncementSnapshot};
use factorn_types::{ClaimHash, Script};

use crate::opcodes::*;
use crate::parse::{instructions, Instruction};
use crate::stack::{cast_to_bool, Stack};
use crate::ScriptValidationError;

/// Everything a deadpool primitive may read besides the stack.
pub struct ExecContext<'a> {
    /// Locking script of the spending transaction's payout output.
    pub destination: &'a [u8],
    pub snapshot: &'a dyn AnnouncementSnapshot,
}

/// What a successful evaluation established.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalOutcome {
    /// N verified by `OP_CHECKDIVVERIFY`, if it ran.
    pub bounty_n: Option<BigUint>,
    /// Factor verified by `OP_CHECKDIVVERIFY`, if it ran.
    pub factor: Option<BigUint>,
    /// Announcement matched by `OP_ANNOUNCEVERIFY`, if it ran.
    pub announcement: Option<AnnouncementRecord>,
}

struct Interpreter<'a> {
    ctx: &'a ExecContext<'a>,
    stack: Stack,
    outcome: EvalOutcome,
}

/// Verify `script_sig` against the `script_pubkey` it spends.
pub fn verify_input(
    script_sig: &Script,
    script_pubkey: &Script,
    ctx: &ExecContext<'_>,
) -> Result<EvalOutcome, ScriptValidationError> {
    if matches!(script_pubkey.as_bytes().first(), Some(&OP_RETURN) | Some(&OP_ANNOUNCE)) {
        return Err(ScriptValidationError::UnspendableOutput);
    }

    let mut interp = Interpreter {
        ctx,
        stack: Stack::new(),
        outcome: EvalOutcome::default(),
    };

    for ins in instructions(script_sig.as_bytes()) {
        let data = ins?
            .pushed_bytes()
            .ok_or(ScriptValidationError::SigPushOnly)?;
        interp.stack.push(data)?;
    }
    interp.run(script_pubkey)?;

    let stack = &interp.stack;
    if stack.is_empty() || !cast_to_bool(stack.peek(0)?) {
        return Err(ScriptValidationError::EvalFalse);
    }
    if stack.len() != 1 {
        return Err(ScriptValidationError::CleanStack(stack.len()));
    }
    Ok(interp.outcome)
}

impl Interpreter<'_> {
    fn run(&mut self, script: &Script) -> Result<(), ScriptValidationError> {
        for ins in instructions(script.as_bytes()) {
            match ins? {
                Instruction::Push(data) => self.stack.push(data.to_vec())?,
                Instruction::Op(op) => self.execute(op)?,
            }
        }
        Ok(())
    }

    fn execute(&mut self, op: u8) -> Result<(), ScriptValidationError> {
        match op {
            OP_1NEGATE => self.stack.push(vec![0x81]),
            OP_1..=OP_16 => self.stack.push(vec![op - OP_1 + 1]),
            OP_NOP => Ok(()),
            OP_VERIFY => {
                let top = self.stack.pop()?;
                if cast_to_bool(&top) {
                    Ok(())
                } else {
                    Err(ScriptValidationError::EvalFalse)
                }
            }
            OP_RETURN | OP_ANNOUNCE => Err(ScriptValidationError::UnspendableOutput),
            OP_DROP => self.stack.pop().map(drop),
            OP_2DROP => {
                self.stack.pop()?;
                self.stack.pop().map(drop)
            }
            OP_DUP => {
                let top = self.stack.peek(0)?.to_vec();
                self.stack.push(top)
            }
            OP_EQUAL | OP_EQUALVERIFY => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                match (op, a == b) {
                    (OP_EQUAL, eq) => self.stack.push_bool(eq),
                    (_, true) => Ok(()),
                    (_, false) => Err(ScriptValidationError::EvalFalse),
                }
            }
            OP_SHA256 => {
                let top = self.stack.pop()?;
                self.stack.push(factorn_crypto::sha256(&top).to_vec())
            }
            OP_HASH256 => {
                let top = self.stack.pop()?;
                self.stack.push(factorn_crypto::sha256d(&top).to_vec())
            }
            OP_CHECKDIVVERIFY => self.check_div_verify(),
            OP_ANNOUNCEVERIFY => self.announce_verify(),
            other => Err(ScriptValidationError::BadOpcode(other)),
        }
    }

    /// `<factor> <N>` → `<factor> <N / factor>`.
    fn check_div_verify(&mut self) -> Result<(), ScriptValidationError> {
        let n_bytes = self.stack.pop()?;
        let factor_bytes = self.stack.pop()?;
        let n = factorn_bignum::decode_canonical(&n_bytes)?;
        let factor = factorn_bignum::decode_canonical(&factor_bytes)?;

        let quotient = factorn_bignum::proper_quotient(&n, &factor)
            .ok_or(ScriptValidationError::NonDivisor)?;

        self.stack.push(factor_bytes)?;
        self.stack.push(factorn_bignum::encode(&quotient))?;
        self.outcome.bounty_n = Some(n);
        self.outcome.factor = Some(factor);
        Ok(())
    }

    /// Reads `<claim_hash> <factor>` in place.
    fn announce_verify(&mut self) -> Result<(), ScriptValidationError> {
        let factor = factorn_bignum::decode_canonical(self.stack.peek(0)?)?;
        let supplied = ClaimHash::from_slice(self.stack.peek(1)?)
            .ok_or(ScriptValidationError::ClaimHashMismatch)?;

        let candidate = factorn_crypto::claim_hash(&factor, self.ctx.destination);
        if candidate != supplied {
            return Err(ScriptValidationError::ClaimHashMismatch);
        }

        let n = self
            .outcome
            .bounty_n
            .as_ref()
            .ok_or(ScriptValidationError::MissingBountyN)?;
        let bounty_id = factorn_crypto::bounty_id(n);
        let announcement = self
            .ctx
            .snapshot
            .find_usable(&bounty_id, &supplied)?
            .ok_or(ScriptValidationError::NoMatchingAnnouncement)?;

        tracing::trace!(
            bounty_id = %bounty_id,
            post_height = announcement.post_height,
            height = self.ctx.snapshot.height(),
            "announcement verified"
        );
        self.outcome.announcement = Some(announcement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{claim_script_sig, entry_script, ScriptBuilder};
    use factorn_nullables::NullAnnouncementStore;
    use factorn_store::{AnnouncementStore, HeightSnapshot};
    use factorn_types::{Amount, BlockHash, ConsensusParams, OutPoint, TxId};

    const P: u64 = 1_000_000_007;
    const Q: u64 = 998_244_353;

    fn n() -> BigUint {
        BigUint::from(P) * BigUint::from(Q)
    }

    fn dest() -> Vec<u8> {
        vec![0x76, 0xa9, 0x14, 0x01, 0x88, 0xac]
    }

    fn announce(store: &NullAnnouncementStore, factor: u64, dest: &[u8], height: u32) {
        store
            .put_announcement(&AnnouncementRecord {
                bounty_id: factorn_crypto::bounty_id(&n()),
                claim_hash: factorn_crypto::claim_hash(&BigUint::from(factor), dest),
                outpoint: OutPoint::new(TxId::new([(factor % 251) as u8; 32]), height),
                burn: Amount::new(1_000_000),
                post_height: height,
                block_hash: BlockHash::ZERO,
            })
            .unwrap();
    }

    fn eval(
        store: &NullAnnouncementStore,
        factor: &BigUint,
        claim_dest: &[u8],
        spend_dest: &[u8],
        height: u32,
    ) -> Result<EvalOutcome, ScriptValidationError> {
        let params = ConsensusParams::regtest();
        let snapshot = HeightSnapshot::new(store, &params, height);
        let ctx = ExecContext {
            destination: spend_dest,
            snapshot: &snapshot,
        };
        let hash = factorn_crypto::claim_hash(factor, claim_dest);
        verify_input(&claim_script_sig(&hash, factor), &entry_script(&n()), &ctx)
    }

    #[test]
    fn either_factor_claims() {
        let store = NullAnnouncementStore::new();
        announce(&store, P, &dest(), 100);
        announce(&store, Q, &dest(), 100);

        let outcome = eval(&store, &BigUint::from(P), &dest(), &dest(), 105).unwrap();
        assert_eq!(outcome.bounty_n, Some(n()));
        assert_eq!(outcome.factor, Some(BigUint::from(P)));
        assert!(outcome.announcement.is_some());
        assert!(eval(&store, &BigUint::from(Q), &dest(), &dest(), 105).is_ok());
    }

    #[test]
    fn trivial_factors_are_non_divisors() {
        let store = NullAnnouncementStore::new();
        for f in [BigUint::from(1u32), n(), BigUint::from(P + 2), n() * 2u32] {
            assert!(matches!(
                eval(&store, &f, &dest(), &dest(), 105),
                Err(ScriptValidationError::NonDivisor)
            ));
        }
    }

    #[test]
    fn hijacked_destination_mismatches() {
        let store = NullAnnouncementStore::new();
        announce(&store, P, &dest(), 100);
        let thief = vec![0x51];
        // Hash committed to the honest destination, payout to the thief.
        assert!(matches!(
            eval(&store, &BigUint::from(P), &dest(), &thief, 105),
            Err(ScriptValidationError::ClaimHashMismatch)
        ));
    }

    #[test]
    fn immature_and_missing_announcements() {
        let store = NullAnnouncementStore::new();
        assert!(matches!(
            eval(&store, &BigUint::from(P), &dest(), &dest(), 105),
            Err(ScriptValidationError::NoMatchingAnnouncement)
        ));
        announce(&store, P, &dest(), 100);
        assert!(matches!(
            eval(&store, &BigUint::from(P), &dest(), &dest(), 104),
            Err(ScriptValidationError::NoMatchingAnnouncement)
        ));
        assert!(matches!(
            eval(&store, &BigUint::from(P), &dest(), &dest(), 205),
            Err(ScriptValidationError::NoMatchingAnnouncement)
        ));
    }

    #[test]
    fn malformed_factor_rejected() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        let snapshot = HeightSnapshot::new(&store, &params, 105);
        let ctx = ExecContext {
            destination: &dest(),
            snapshot: &snapshot,
        };
        let mut padded = factorn_bignum::encode(&BigUint::from(P));
        padded.push(0);
        let sig = ScriptBuilder::new()
            .push_slice(&[0u8; 32])
            .push_slice(&padded)
            .into_script();
        assert!(matches!(
            verify_input(&sig, &entry_script(&n()), &ctx),
            Err(ScriptValidationError::MalformedInteger)
        ));
    }

    #[test]
    fn announce_verify_without_div_lacks_n() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        let snapshot = HeightSnapshot::new(&store, &params, 105);
        let d = dest();
        let ctx = ExecContext {
            destination: &d,
            snapshot: &snapshot,
        };
        let factor = BigUint::from(P);
        let hash = factorn_crypto::claim_hash(&factor, &d);
        let lock = ScriptBuilder::new()
            .push_opcode(OP_ANNOUNCEVERIFY)
            .push_opcode(OP_2DROP)
            .push_opcode(OP_TRUE)
            .into_script();
        assert!(matches!(
            verify_input(&claim_script_sig(&hash, &factor), &lock, &ctx),
            Err(ScriptValidationError::MissingBountyN)
        ));
    }

    #[test]
    fn stack_shape_errors() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        let snapshot = HeightSnapshot::new(&store, &params, 105);
        let d = dest();
        let ctx = ExecContext {
            destination: &d,
            snapshot: &snapshot,
        };
        let empty = Script::new(Vec::new());
        assert!(matches!(
            verify_input(&empty, &entry_script(&n()), &ctx),
            Err(ScriptValidationError::StackUnderflow)
        ));
        let two_true = Script::new(vec![OP_TRUE, OP_TRUE]);
        assert!(matches!(
            verify_input(&empty, &two_true, &ctx),
            Err(ScriptValidationError::CleanStack(2))
        ));
        assert!(matches!(
            verify_input(&Script::new(vec![OP_DUP]), &two_true, &ctx),
            Err(ScriptValidationError::SigPushOnly)
        ));
        assert!(matches!(
            verify_input(&empty, &Script::new(vec![OP_0]), &ctx),
            Err(ScriptValidationError::EvalFalse)
        ));
        assert!(matches!(
            verify_input(&empty, &Script::new(vec![OP_ANNOUNCE]), &ctx),
            Err(ScriptValidationError::UnspendableOutput)
        ));
        assert!(matches!(
            verify_input(&empty, &Script::new(vec![0xfe]), &ctx),
            Err(ScriptValidationError::BadOpcode(0xfe))
        ));
    }

    #[test]
    fn small_integer_opcodes_count_as_pushes() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        let snapshot = HeightSnapshot::new(&store, &params, 105);
        let d = dest();
        let ctx = ExecContext {
            destination: &d,
            snapshot: &snapshot,
        };
        let two_equal = Script::new(vec![OP_1 + 1, OP_EQUAL]);
        assert!(verify_input(&Script::new(vec![OP_1 + 1]), &two_equal, &ctx).is_ok());

        // A factor of 3 revealed with OP_3 instead of a one-byte push.
        let n = BigUint::from(3u32) * BigUint::from(Q);
        let factor = BigUint::from(3u32);
        let hash = factorn_crypto::claim_hash(&factor, &d);
        store
            .put_announcement(&AnnouncementRecord {
                bounty_id: factorn_crypto::bounty_id(&n),
                claim_hash: hash,
                outpoint: OutPoint::new(TxId::new([3; 32]), 0),
                burn: Amount::new(1_000_000),
                post_height: 100,
                block_hash: BlockHash::ZERO,
            })
            .unwrap();
        let sig = ScriptBuilder::new()
            .push_slice(hash.as_bytes())
            .push_opcode(OP_1 + 2)
            .into_script();
        let outcome = verify_input(&sig, &entry_script(&n), &ctx).unwrap();
        assert_eq!(outcome.factor, Some(factor));
        assert!(outcome.announcement.is_some());
    }
}
