//! An in-memory overlay that collects several commits into one batch.
//!
//! A reorg undoes and applies many blocks. Running them against a
//! [`StagedStore`] lets each step read the previous steps' writes while the
//! backing store stays untouched until the final [`IndexStore::commit`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use factorn_store::{BlockUndo, BountyRecord, IndexBatch, IndexStore, IndexTip, StoreError};
use factorn_types::{BlockHash, BountyId, OutPoint};

/// Pending writes. `None` marks a delete.
#[derive(Default)]
struct Changes {
    records: BTreeMap<BountyId, Option<BountyRecord>>,
    entry_owners: HashMap<OutPoint, Option<BountyId>>,
    undo: HashMap<BlockHash, Option<BlockUndo>>,
    tip: Option<Option<IndexTip>>,
}

pub(crate) struct StagedStore<'a, S: IndexStore + ?Sized> {
    base: &'a S,
    changes: Mutex<Changes>,
}

impl<'a, S: IndexStore + ?Sized> StagedStore<'a, S> {
    pub(crate) fn new(base: &'a S) -> Self {
        Self {
            base,
            changes: Mutex::new(Changes::default()),
        }
    }

    fn changes(&self) -> std::sync::MutexGuard<'_, Changes> {
        self.changes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything staged so far as a single batch for the backing store.
    pub(crate) fn into_batch(self) -> Result<IndexBatch, StoreError> {
        let changes = self.changes.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut batch = IndexBatch {
            tip: match changes.tip {
                Some(tip) => tip,
                None => self.base.tip()?,
            },
            ..IndexBatch::default()
        };
        for (id, record) in changes.records {
            match record {
                Some(record) => batch.put_records.push(record),
                None => batch.delete_records.push(id),
            }
        }
        for (outpoint, owner) in changes.entry_owners {
            match owner {
                Some(id) => batch.put_entry_owners.push((outpoint, id)),
                None => batch.delete_entry_owners.push(outpoint),
            }
        }
        for (hash, undo) in changes.undo {
            match undo {
                Some(undo) => batch.put_undo.push(undo),
                None => batch.delete_undo.push(hash),
            }
        }
        Ok(batch)
    }
}

impl<S: IndexStore + ?Sized> IndexStore for StagedStore<'_, S> {
    fn get_record(&self, bounty_id: &BountyId) -> Result<Option<BountyRecord>, StoreError> {
        if let Some(staged) = self.changes().records.get(bounty_id) {
            return Ok(staged.clone());
        }
        self.base.get_record(bounty_id)
    }

    fn records(&self) -> Result<Vec<BountyRecord>, StoreError> {
        let mut merged: BTreeMap<BountyId, BountyRecord> = self
            .base
            .records()?
            .into_iter()
            .map(|r| (r.bounty_id, r))
            .collect();
        for (id, staged) in &self.changes().records {
            match staged {
                Some(record) => merged.insert(*id, record.clone()),
                None => merged.remove(id),
            };
        }
        Ok(merged.into_values().collect())
    }

    fn entry_owner(&self, outpoint: &OutPoint) -> Result<Option<BountyId>, StoreError> {
        if let Some(staged) = self.changes().entry_owners.get(outpoint) {
            return Ok(*staged);
        }
        self.base.entry_owner(outpoint)
    }

    fn get_undo(&self, block_hash: &BlockHash) -> Result<Option<BlockUndo>, StoreError> {
        if let Some(staged) = self.changes().undo.get(block_hash) {
            return Ok(staged.clone());
        }
        self.base.get_undo(block_hash)
    }

    fn tip(&self) -> Result<Option<IndexTip>, StoreError> {
        if let Some(staged) = self.changes().tip {
            return Ok(staged);
        }
        self.base.tip()
    }

    fn commit(&self, batch: IndexBatch) -> Result<(), StoreError> {
        let mut changes = self.changes();
        for id in batch.delete_records {
            changes.records.insert(id, None);
        }
        for record in batch.put_records {
            changes.records.insert(record.bounty_id, Some(record));
        }
        for outpoint in batch.delete_entry_owners {
            changes.entry_owners.insert(outpoint, None);
        }
        for (outpoint, id) in batch.put_entry_owners {
            changes.entry_owners.insert(outpoint, Some(id));
        }
        for hash in batch.delete_undo {
            changes.undo.insert(hash, None);
        }
        for undo in batch.put_undo {
            changes.undo.insert(undo.block_hash, Some(undo));
        }
        changes.tip = Some(batch.tip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorn_nullables::NullIndexStore;

    fn tip(height: u32) -> IndexTip {
        IndexTip {
            hash: BlockHash::new([height as u8; 32]),
            height,
        }
    }

    #[test]
    fn staged_writes_stay_off_the_base_until_flushed() {
        let base = NullIndexStore::new();
        let kept = BountyRecord::new(BountyId::new([1; 32]), vec![15]);
        let dropped = BountyRecord::new(BountyId::new([2; 32]), vec![21]);
        base.commit(IndexBatch {
            put_records: vec![kept.clone(), dropped.clone()],
            tip: Some(tip(1)),
            ..Default::default()
        })
        .unwrap();

        let staged = StagedStore::new(&base);
        let added = BountyRecord::new(BountyId::new([3; 32]), vec![35]);
        staged
            .commit(IndexBatch {
                put_records: vec![added.clone()],
                delete_records: vec![dropped.bounty_id],
                tip: Some(tip(2)),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(staged.get_record(&dropped.bounty_id).unwrap(), None);
        assert_eq!(staged.records().unwrap(), vec![kept.clone(), added.clone()]);
        assert_eq!(staged.tip().unwrap(), Some(tip(2)));
        assert_eq!(base.tip().unwrap(), Some(tip(1)));
        assert_eq!(base.records().unwrap().len(), 2);

        base.commit(staged.into_batch().unwrap()).unwrap();
        assert_eq!(base.records().unwrap(), vec![kept, added]);
        assert_eq!(base.tip().unwrap(), Some(tip(2)));
    }

    #[test]
    fn later_commits_win() {
        let base = NullIndexStore::new();
        let staged = StagedStore::new(&base);
        let outpoint = OutPoint::new(factorn_types::TxId::new([4; 32]), 0);
        let undo = BlockUndo {
            block_hash: BlockHash::new([5; 32]),
            prev_hash: BlockHash::ZERO,
            height: 1,
            ops: Vec::new(),
        };
        staged
            .commit(IndexBatch {
                put_entry_owners: vec![(outpoint, BountyId::new([1; 32]))],
                put_undo: vec![undo.clone()],
                tip: Some(tip(1)),
                ..Default::default()
            })
            .unwrap();
        staged
            .commit(IndexBatch {
                delete_entry_owners: vec![outpoint],
                delete_undo: vec![undo.block_hash],
                tip: None,
                ..Default::default()
            })
            .unwrap();

        let batch = staged.into_batch().unwrap();
        assert_eq!(batch.delete_entry_owners, vec![outpoint]);
        assert_eq!(batch.delete_undo, vec![undo.block_hash]);
        assert!(batch.put_entry_owners.is_empty() && batch.put_undo.is_empty());
        assert_eq!(batch.tip, None);
    }

    #[test]
    fn untouched_tip_is_carried_over() {
        let base = NullIndexStore::new();
        base.commit(IndexBatch {
            tip: Some(tip(7)),
            ..Default::default()
        })
        .unwrap();
        let batch = StagedStore::new(&base).into_batch().unwrap();
        assert_eq!(batch.tip, Some(tip(7)));
    }
}
