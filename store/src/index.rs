//! Deadpool index storage: per-bounty aggregates and per-block undo logs.

use crate::{AnnouncementRecord, StoreError};
use factorn_types::{Amount, BlockHash, BountyId, OutPoint, TxId};
use serde::{Deserialize, Serialize};

/// How an entry was claimed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub txid: TxId,
    pub block_hash: BlockHash,
    pub height: u32,
    /// Revealed factor as pushed by the claim. `None` when the spending
    /// script is not a claim witness.
    pub factor: Option<Vec<u8>>,
}

/// A bounty-carrying output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub outpoint: OutPoint,
    pub amount: Amount,
    pub height: u32,
    pub block_hash: BlockHash,
    pub claim: Option<ClaimRecord>,
}

impl EntryRecord {
    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }
}

/// Everything the index knows about one N.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyRecord {
    pub bounty_id: BountyId,
    /// N, canonically encoded.
    pub n: Vec<u8>,
    /// Entries in confirmation order.
    pub entries: Vec<EntryRecord>,
    /// Announcements in confirmation order.
    pub announcements: Vec<AnnouncementRecord>,
}

impl BountyRecord {
    pub fn new(bounty_id: BountyId, n: Vec<u8>) -> Self {
        Self {
            bounty_id,
            n,
            entries: Vec::new(),
            announcements: Vec::new(),
        }
    }

    /// Sum of all unclaimed entry amounts. Always derived, never stored.
    pub fn bounty(&self) -> Amount {
        self.entries
            .iter()
            .filter(|e| !e.is_claimed())
            .map(|e| e.amount)
            .sum()
    }

    pub fn unclaimed_entries(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_claimed()).count()
    }

    /// True once every entry is claimed (and there is at least one entry).
    pub fn is_fully_claimed(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(EntryRecord::is_claimed)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.announcements.is_empty()
    }

    pub fn entry(&self, outpoint: &OutPoint) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.outpoint == *outpoint)
    }

    pub fn entry_mut(&mut self, outpoint: &OutPoint) -> Option<&mut EntryRecord> {
        self.entries.iter_mut().find(|e| e.outpoint == *outpoint)
    }
}

/// One reversible change made while applying a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoOp {
    /// The bounty record did not exist before this block.
    RecordCreated { bounty_id: BountyId },
    EntryAdded { bounty_id: BountyId, outpoint: OutPoint },
    AnnouncementAdded { bounty_id: BountyId, outpoint: OutPoint },
    EntryClaimed { bounty_id: BountyId, outpoint: OutPoint },
}

/// Undo log for one applied block, keyed by its hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUndo {
    pub block_hash: BlockHash,
    pub prev_hash: BlockHash,
    pub height: u32,
    /// Changes in the order they were made.
    pub ops: Vec<UndoOp>,
}

/// The last block folded into the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTip {
    pub hash: BlockHash,
    pub height: u32,
}

/// All writes produced by one apply, undo or reorg, committed atomically.
///
/// Deletes in each table are applied before puts.
#[derive(Clone, Debug, Default)]
pub struct IndexBatch {
    pub put_records: Vec<BountyRecord>,
    pub delete_records: Vec<BountyId>,
    pub put_entry_owners: Vec<(OutPoint, BountyId)>,
    pub delete_entry_owners: Vec<OutPoint>,
    pub put_undo: Vec<BlockUndo>,
    pub delete_undo: Vec<BlockHash>,
    /// Tip after the batch. `None` empties the tip.
    pub tip: Option<IndexTip>,
}

/// Trait for the deadpool index backend.
///
/// The indexer is the only writer. Every mutation goes through
/// [`IndexStore::commit`] so a reader never observes half a block.
pub trait IndexStore: Send + Sync {
    fn get_record(&self, bounty_id: &BountyId) -> Result<Option<BountyRecord>, StoreError>;

    /// All records ordered by bounty id.
    fn records(&self) -> Result<Vec<BountyRecord>, StoreError>;

    /// The bounty owning an entry outpoint, if it is an indexed entry.
    fn entry_owner(&self, outpoint: &OutPoint) -> Result<Option<BountyId>, StoreError>;

    fn get_undo(&self, block_hash: &BlockHash) -> Result<Option<BlockUndo>, StoreError>;

    fn tip(&self) -> Result<Option<IndexTip>, StoreError>;

    /// Apply a batch atomically.
    fn commit(&self, batch: IndexBatch) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(vout: u32, amount: u64, claimed: bool) -> EntryRecord {
        EntryRecord {
            outpoint: OutPoint::new(TxId::new([1; 32]), vout),
            amount: Amount::new(amount),
            height: 10,
            block_hash: BlockHash::new([2; 32]),
            claim: claimed.then(|| ClaimRecord {
                txid: TxId::new([3; 32]),
                block_hash: BlockHash::new([4; 32]),
                height: 20,
                factor: Some(vec![3]),
            }),
        }
    }

    #[test]
    fn bounty_sums_only_unclaimed() {
        let mut record = BountyRecord::new(BountyId::new([9; 32]), vec![15]);
        record.entries = vec![entry(0, 100, false), entry(1, 50, true), entry(2, 7, false)];
        assert_eq!(record.bounty(), Amount::new(107));
        assert_eq!(record.unclaimed_entries(), 2);
        assert!(!record.is_fully_claimed());
    }

    #[test]
    fn fully_claimed_requires_entries() {
        let mut record = BountyRecord::new(BountyId::new([9; 32]), vec![15]);
        assert!(!record.is_fully_claimed());
        record.entries = vec![entry(0, 100, true)];
        assert!(record.is_fully_claimed());
        assert_eq!(record.bounty(), Amount::ZERO);
    }
}
