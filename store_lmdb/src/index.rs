//! LMDB implementation of IndexStore.
//!
//! Four databases:
//! - `bounty_records`: `bounty_id(32)` → bincode `BountyRecord`.
//! - `entry_owners`: `txid(32) ++ vout_be(4)` → `bounty_id(32)`.
//! - `block_undo`: `block_hash(32)` → bincode `BlockUndo`.
//! - `meta`: `"index_tip"` → bincode `IndexTip` (shared with the schema version).
//!
//! [`IndexStore::commit`] writes a whole batch in one LMDB write transaction.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use factorn_store::{BlockUndo, BountyRecord, IndexBatch, IndexStore, IndexTip, StoreError};
use factorn_types::{BlockHash, BountyId, OutPoint};

use crate::LmdbError;

const INDEX_TIP_KEY: &[u8] = b"index_tip";

pub struct LmdbIndexStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) entry_owners_db: Database<Bytes, Bytes>,
    pub(crate) undo_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

fn outpoint_key(outpoint: &OutPoint) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..32].copy_from_slice(outpoint.txid.as_bytes());
    key[32..].copy_from_slice(&outpoint.vout.to_be_bytes());
    key
}

fn bounty_id_from(bytes: &[u8]) -> Result<BountyId, LmdbError> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| {
        LmdbError::Serialization(format!("bounty id has {} bytes, expected 32", bytes.len()))
    })?;
    Ok(BountyId::new(arr))
}

impl IndexStore for LmdbIndexStore {
    fn get_record(&self, bounty_id: &BountyId) -> Result<Option<BountyRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .records_db
            .get(&rtxn, &bounty_id.as_bytes()[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn records(&self) -> Result<Vec<BountyRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.records_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_, bytes) = item.map_err(LmdbError::from)?;
            let record: BountyRecord = bincode::deserialize(bytes).map_err(LmdbError::from)?;
            results.push(record);
        }
        Ok(results)
    }

    fn entry_owner(&self, outpoint: &OutPoint) -> Result<Option<BountyId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = outpoint_key(outpoint);
        match self
            .entry_owners_db
            .get(&rtxn, &key[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bounty_id_from(bytes)?)),
            None => Ok(None),
        }
    }

    fn get_undo(&self, block_hash: &BlockHash) -> Result<Option<BlockUndo>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .undo_db
            .get(&rtxn, &block_hash.as_bytes()[..])
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn tip(&self) -> Result<Option<IndexTip>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .meta_db
            .get(&rtxn, INDEX_TIP_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn commit(&self, batch: IndexBatch) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        for id in &batch.delete_records {
            self.records_db
                .delete(&mut wtxn, &id.as_bytes()[..])
                .map_err(LmdbError::from)?;
        }
        for record in &batch.put_records {
            let value = bincode::serialize(record).map_err(LmdbError::from)?;
            self.records_db
                .put(&mut wtxn, &record.bounty_id.as_bytes()[..], &value)
                .map_err(LmdbError::from)?;
        }

        for outpoint in &batch.delete_entry_owners {
            self.entry_owners_db
                .delete(&mut wtxn, &outpoint_key(outpoint)[..])
                .map_err(LmdbError::from)?;
        }
        for (outpoint, id) in &batch.put_entry_owners {
            self.entry_owners_db
                .put(&mut wtxn, &outpoint_key(outpoint)[..], &id.as_bytes()[..])
                .map_err(LmdbError::from)?;
        }

        for hash in &batch.delete_undo {
            self.undo_db
                .delete(&mut wtxn, &hash.as_bytes()[..])
                .map_err(LmdbError::from)?;
        }
        for undo in &batch.put_undo {
            let value = bincode::serialize(undo).map_err(LmdbError::from)?;
            self.undo_db
                .put(&mut wtxn, &undo.block_hash.as_bytes()[..], &value)
                .map_err(LmdbError::from)?;
        }

        match &batch.tip {
            Some(tip) => {
                let value = bincode::serialize(tip).map_err(LmdbError::from)?;
                self.meta_db
                    .put(&mut wtxn, INDEX_TIP_KEY, &value)
                    .map_err(LmdbError::from)?;
            }
            None => {
                self.meta_db
                    .delete(&mut wtxn, INDEX_TIP_KEY)
                    .map_err(LmdbError::from)?;
            }
        }

        wtxn.commit().map_err(LmdbError::from)?;
        tracing::trace!(
            records = batch.put_records.len(),
            deleted = batch.delete_records.len(),
            tip = ?batch.tip.map(|t| t.height),
            "index batch committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use factorn_store::{EntryRecord, UndoOp};
    use factorn_types::{Amount, TxId};

    /// Helper: open a temporary LMDB environment.
    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    fn sample_record() -> BountyRecord {
        let mut record = BountyRecord::new(BountyId::new([3; 32]), vec![0x0f]);
        record.entries.push(EntryRecord {
            outpoint: OutPoint::new(TxId::new([4; 32]), 1),
            amount: Amount::from_coins(2),
            height: 12,
            block_hash: BlockHash::new([12; 32]),
            claim: None,
        });
        record
    }

    #[test]
    fn commit_writes_all_tables() {
        let (_dir, env) = temp_env();
        let store = env.index_store();
        let record = sample_record();
        let outpoint = record.entries[0].outpoint;
        let undo = BlockUndo {
            block_hash: BlockHash::new([12; 32]),
            prev_hash: BlockHash::new([11; 32]),
            height: 12,
            ops: vec![
                UndoOp::RecordCreated {
                    bounty_id: record.bounty_id,
                },
                UndoOp::EntryAdded {
                    bounty_id: record.bounty_id,
                    outpoint,
                },
            ],
        };
        let tip = IndexTip {
            hash: undo.block_hash,
            height: 12,
        };

        store
            .commit(IndexBatch {
                put_records: vec![record.clone()],
                put_entry_owners: vec![(outpoint, record.bounty_id)],
                put_undo: vec![undo.clone()],
                tip: Some(tip),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.get_record(&record.bounty_id).unwrap(), Some(record.clone()));
        assert_eq!(store.entry_owner(&outpoint).unwrap(), Some(record.bounty_id));
        assert_eq!(store.get_undo(&undo.block_hash).unwrap(), Some(undo.clone()));
        assert_eq!(store.tip().unwrap(), Some(tip));
        assert_eq!(store.records().unwrap().len(), 1);

        store
            .commit(IndexBatch {
                delete_records: vec![record.bounty_id],
                delete_entry_owners: vec![outpoint],
                delete_undo: vec![undo.block_hash],
                tip: None,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.get_record(&record.bounty_id).unwrap(), None);
        assert_eq!(store.entry_owner(&outpoint).unwrap(), None);
        assert_eq!(store.get_undo(&undo.block_hash).unwrap(), None);
        assert_eq!(store.tip().unwrap(), None);
    }

    #[test]
    fn tip_survives_reopen() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let tip = IndexTip {
            hash: BlockHash::new([9; 32]),
            height: 9,
        };
        {
            let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap();
            env.index_store()
                .commit(IndexBatch {
                    tip: Some(tip),
                    ..Default::default()
                })
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap();
        assert_eq!(env.index_store().tip().unwrap(), Some(tip));
    }
}
