//! Block and transaction fixtures shared by the index tests.

use std::sync::Arc;

use factorn_bignum::BigUint;
use factorn_script::{announce_script, claim_script_sig, entry_script};
use factorn_types::{Amount, Block, BlockHash, OutPoint, Script, Transaction, TxId, TxIn, TxOut};

pub fn p() -> BigUint {
    (BigUint::from(1u32) << 89u32) - 1u32
}

pub fn q() -> BigUint {
    (BigUint::from(1u32) << 107u32) - 1u32
}

pub fn n() -> BigUint {
    p() * q()
}

pub fn other_n() -> BigUint {
    p() * p()
}

pub fn dest() -> Script {
    Script::new(vec![0x00, 0x14, 0x42, 0x42])
}

/// Block hashes encode `(branch, height)` so forks never collide.
pub fn hash(branch: u8, height: u32) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[0] = branch;
    bytes[1..5].copy_from_slice(&height.to_le_bytes());
    bytes[31] = 0xb1;
    BlockHash::new(bytes)
}

pub fn block(branch: u8, height: u32, prev: BlockHash, transactions: Vec<Transaction>) -> Arc<Block> {
    Arc::new(Block {
        hash: hash(branch, height),
        prev_hash: prev,
        height,
        transactions,
    })
}

/// A funding input so otherwise identical transactions get distinct txids.
fn funding(tag: u8) -> TxIn {
    TxIn::new(OutPoint::new(TxId::new([tag; 32]), 7), Script::new(vec![0x01, tag]))
}

pub fn entry_tx(tag: u8, n: &BigUint, coins: u64) -> Transaction {
    Transaction::new(
        vec![funding(tag)],
        vec![TxOut::new(Amount::from_coins(coins), entry_script(n))],
    )
}

pub fn announce_tx(tag: u8, n: &BigUint, factor: &BigUint, burn: u64) -> Transaction {
    let hash = factorn_crypto::claim_hash(factor, dest().as_bytes());
    Transaction::new(
        vec![funding(tag)],
        vec![TxOut::new(Amount::new(burn), announce_script(n, &hash))],
    )
}

pub fn claim_tx(entries: &[OutPoint], factor: &BigUint) -> Transaction {
    let hash = factorn_crypto::claim_hash(factor, dest().as_bytes());
    let sig = claim_script_sig(&hash, factor);
    Transaction::new(
        entries.iter().map(|o| TxIn::new(*o, sig.clone())).collect(),
        vec![TxOut::new(Amount::from_coins(1), dest())],
    )
}

pub fn genesis() -> Arc<Block> {
    block(0, 0, BlockHash::ZERO, Vec::new())
}
