//! Transaction builders for wallets and tooling.
//!
//! Entry and announce builders return unfunded templates (outputs only);
//! funding and signing belong to the wallet. Claim transactions are complete:
//! deadpool inputs need no signature, only the revealed factor.

use factorn_bignum::BigUint;
use factorn_types::{Amount, OutPoint, Script, Transaction, TxIn, TxOut};

use crate::template::{announce_script, claim_script_sig, entry_script, DeadpoolScript};
use crate::BuildError;

/// Fee rate used for claim transactions, in base units per byte.
pub const DEFAULT_CLAIM_FEE_RATE: u64 = 10;

/// An unspent entry output to be claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimInput {
    pub outpoint: OutPoint,
    pub amount: Amount,
    pub script_pubkey: Script,
}

/// Template with a single entry output offering `amount` for factoring `n`.
pub fn build_entry_template(n: &BigUint, amount: Amount) -> Result<Transaction, BuildError> {
    factorn_bignum::check_deadpool_integer(&factorn_bignum::encode(n))?;
    Ok(Transaction::new(
        Vec::new(),
        vec![TxOut::new(amount, entry_script(n))],
    ))
}

/// Template with a single announcement output burning `burn`.
///
/// Commits `solution` to `destination`, the script the later claim will pay.
pub fn build_announce_template(
    n: &BigUint,
    solution: &BigUint,
    destination: &Script,
    burn: Amount,
) -> Result<Transaction, BuildError> {
    factorn_bignum::check_deadpool_integer(&factorn_bignum::encode(n))?;
    if factorn_bignum::proper_quotient(n, solution).is_none() {
        return Err(BuildError::InvalidSolution);
    }
    let claim_hash = factorn_crypto::claim_hash(solution, destination.as_bytes());
    Ok(Transaction::new(
        Vec::new(),
        vec![TxOut::new(burn, announce_script(n, &claim_hash))],
    ))
}

/// Claim every given entry (all for the same N) to one destination output.
///
/// The fee is `serialized size * fee_rate`, taken from the claimed total.
pub fn build_claim_transaction(
    entries: &[ClaimInput],
    solution: &BigUint,
    destination: &Script,
    fee_rate: u64,
) -> Result<Transaction, BuildError> {
    let first = entries.first().ok_or(BuildError::NoEntries)?;
    let n_bytes = entry_n(first)?;
    for entry in &entries[1..] {
        if entry_n(entry)? != n_bytes {
            return Err(BuildError::MixedBounties);
        }
    }
    let n = factorn_bignum::decode_canonical(&n_bytes)?;
    if factorn_bignum::proper_quotient(&n, solution).is_none() {
        return Err(BuildError::InvalidSolution);
    }

    let claim_hash = factorn_crypto::claim_hash(solution, destination.as_bytes());
    let script_sig = claim_script_sig(&claim_hash, solution);
    let inputs = entries
        .iter()
        .map(|e| TxIn::new(e.outpoint, script_sig.clone()))
        .collect();
    let total: Amount = entries.iter().map(|e| e.amount).sum();

    let mut tx = Transaction::new(inputs, vec![TxOut::new(total, destination.clone())]);
    let fee = (tx.size() as u64).saturating_mul(fee_rate);
    if fee >= total.units() {
        return Err(BuildError::InsufficientFunds {
            total: total.units(),
            fee,
        });
    }
    tx.outputs[0].value = Amount::new(total.units() - fee);
    Ok(tx)
}

fn entry_n(entry: &ClaimInput) -> Result<Vec<u8>, BuildError> {
    match DeadpoolScript::classify(&entry.script_pubkey) {
        Some(DeadpoolScript::Entry { n }) => Ok(n),
        _ => Err(BuildError::NotAnEntry(entry.outpoint)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_claim_script_sig, DeadpoolScript};
    use factorn_types::{TxId, COIN};

    fn p() -> BigUint {
        (BigUint::from(1u32) << 89u32) - 1u32
    }

    fn q() -> BigUint {
        (BigUint::from(1u32) << 107u32) - 1u32
    }

    fn n() -> BigUint {
        p() * q()
    }

    fn dest() -> Script {
        Script::new(vec![0x00, 0x14, 0xab, 0xcd])
    }

    fn entry(i: u8, coins: u64, n: &BigUint) -> ClaimInput {
        ClaimInput {
            outpoint: OutPoint::new(TxId::new([i; 32]), 0),
            amount: Amount::from_coins(coins),
            script_pubkey: entry_script(n),
        }
    }

    #[test]
    fn entry_template_carries_n() {
        let tx = build_entry_template(&n(), Amount::from_coins(1)).unwrap();
        assert!(tx.inputs.is_empty());
        assert_eq!(
            DeadpoolScript::classify(&tx.outputs[0].script_pubkey),
            Some(DeadpoolScript::Entry {
                n: factorn_bignum::encode(&n())
            })
        );
    }

    #[test]
    fn entry_template_rejects_small_n() {
        assert!(matches!(
            build_entry_template(&BigUint::from(15u32), Amount::from_coins(1)),
            Err(BuildError::Integer(_))
        ));
    }

    #[test]
    fn announce_template_commits_destination() {
        let tx = build_announce_template(&n(), &p(), &dest(), Amount::new(1_000_000)).unwrap();
        let expected = factorn_crypto::claim_hash(&p(), dest().as_bytes());
        match DeadpoolScript::classify(&tx.outputs[0].script_pubkey) {
            Some(DeadpoolScript::Announce { claim_hash, .. }) => assert_eq!(claim_hash, expected),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            build_announce_template(&n(), &(p() + 2u32), &dest(), Amount::new(1_000_000)),
            Err(BuildError::InvalidSolution)
        );
    }

    #[test]
    fn claim_pays_total_minus_size_fee() {
        let entries = vec![entry(1, 2, &n()), entry(2, 3, &n())];
        let tx = build_claim_transaction(&entries, &q(), &dest(), DEFAULT_CLAIM_FEE_RATE).unwrap();
        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].script_pubkey, dest());

        let fee = tx.size() as u64 * DEFAULT_CLAIM_FEE_RATE;
        assert_eq!(tx.outputs[0].value.units(), 5 * COIN - fee);

        let witness = parse_claim_script_sig(&tx.inputs[0].script_sig).unwrap();
        assert_eq!(witness.factor, factorn_bignum::encode(&q()));
    }

    #[test]
    fn claim_rejects_mixed_and_bad_inputs() {
        let other_n = p() * p();
        assert_eq!(
            build_claim_transaction(
                &[entry(1, 1, &n()), entry(2, 1, &other_n)],
                &p(),
                &dest(),
                DEFAULT_CLAIM_FEE_RATE
            ),
            Err(BuildError::MixedBounties)
        );
        assert_eq!(
            build_claim_transaction(&[], &p(), &dest(), DEFAULT_CLAIM_FEE_RATE),
            Err(BuildError::NoEntries)
        );
        assert_eq!(
            build_claim_transaction(&[entry(1, 1, &n())], &BigUint::from(3u32), &dest(), 1),
            Err(BuildError::InvalidSolution)
        );
        let dust = ClaimInput {
            amount: Amount::new(100),
            ..entry(1, 0, &n())
        };
        assert!(matches!(
            build_claim_transaction(&[dust], &p(), &dest(), DEFAULT_CLAIM_FEE_RATE),
            Err(BuildError::InsufficientFunds { .. })
        ));
    }
}
