//! In-memory stores for tests. Thread-safe, no persistence.

use factorn_store::{
    AnnouncementRecord, AnnouncementStore, BlockUndo, BountyRecord, IndexBatch, IndexStore,
    IndexTip, StoreError,
};
use factorn_types::{BlockHash, BountyId, OutPoint};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

/// An in-memory announcement store.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullAnnouncementStore {
    announcements: Mutex<BTreeMap<(BountyId, OutPoint), AnnouncementRecord>>,
}

impl NullAnnouncementStore {
    pub fn new() -> Self {
        Self {
            announcements: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Default for NullAnnouncementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementStore for NullAnnouncementStore {
    fn put_announcement(&self, record: &AnnouncementRecord) -> Result<(), StoreError> {
        let mut map = self.announcements.lock().unwrap();
        let key = (record.bounty_id, record.outpoint);
        if map.contains_key(&key) {
            return Err(StoreError::DuplicateAnnouncement(record.outpoint));
        }
        map.insert(key, record.clone());
        Ok(())
    }

    fn delete_announcement(&self, bounty_id: &BountyId, outpoint: &OutPoint) -> Result<(), StoreError> {
        self.announcements
            .lock()
            .unwrap()
            .remove(&(*bounty_id, *outpoint));
        Ok(())
    }

    fn put_announcements(&self, records: &[AnnouncementRecord]) -> Result<(), StoreError> {
        let mut map = self.announcements.lock().unwrap();
        let mut seen = BTreeSet::new();
        for record in records {
            let key = (record.bounty_id, record.outpoint);
            if map.contains_key(&key) || !seen.insert(key) {
                return Err(StoreError::DuplicateAnnouncement(record.outpoint));
            }
        }
        for record in records {
            map.insert((record.bounty_id, record.outpoint), record.clone());
        }
        Ok(())
    }

    fn delete_announcements(&self, keys: &[(BountyId, OutPoint)]) -> Result<(), StoreError> {
        let mut map = self.announcements.lock().unwrap();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }

    fn get_announcement(
        &self,
        bounty_id: &BountyId,
        outpoint: &OutPoint,
    ) -> Result<AnnouncementRecord, StoreError> {
        self.announcements
            .lock()
            .unwrap()
            .get(&(*bounty_id, *outpoint))
            .cloned()
            .ok_or_else(|| StoreError::AnnouncementNotFound(*outpoint))
    }

    fn announcements_for(&self, bounty_id: &BountyId) -> Result<Vec<AnnouncementRecord>, StoreError> {
        Ok(self
            .announcements
            .lock()
            .unwrap()
            .iter()
            .filter(|((id, _), _)| id == bounty_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn announcement_count(&self) -> Result<u64, StoreError> {
        Ok(self.announcements.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
struct IndexState {
    records: BTreeMap<BountyId, BountyRecord>,
    entry_owners: HashMap<OutPoint, BountyId>,
    undo: HashMap<BlockHash, BlockUndo>,
    tip: Option<IndexTip>,
}

/// An in-memory deadpool index store.
///
/// A single mutex guards all tables, so a commit is atomic to readers.
pub struct NullIndexStore {
    state: Mutex<IndexState>,
}

impl NullIndexStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IndexState::default()),
        }
    }

    /// Number of undo logs currently retained.
    pub fn undo_count(&self) -> usize {
        self.state.lock().unwrap().undo.len()
    }
}

impl Default for NullIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore for NullIndexStore {
    fn get_record(&self, bounty_id: &BountyId) -> Result<Option<BountyRecord>, StoreError> {
        Ok(self.state.lock().unwrap().records.get(bounty_id).cloned())
    }

    fn records(&self) -> Result<Vec<BountyRecord>, StoreError> {
        Ok(self.state.lock().unwrap().records.values().cloned().collect())
    }

    fn entry_owner(&self, outpoint: &OutPoint) -> Result<Option<BountyId>, StoreError> {
        Ok(self.state.lock().unwrap().entry_owners.get(outpoint).copied())
    }

    fn get_undo(&self, block_hash: &BlockHash) -> Result<Option<BlockUndo>, StoreError> {
        Ok(self.state.lock().unwrap().undo.get(block_hash).cloned())
    }

    fn tip(&self) -> Result<Option<IndexTip>, StoreError> {
        Ok(self.state.lock().unwrap().tip)
    }

    fn commit(&self, batch: IndexBatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        for id in &batch.delete_records {
            state.records.remove(id);
        }
        for record in batch.put_records {
            state.records.insert(record.bounty_id, record);
        }
        for outpoint in &batch.delete_entry_owners {
            state.entry_owners.remove(outpoint);
        }
        for (outpoint, id) in batch.put_entry_owners {
            state.entry_owners.insert(outpoint, id);
        }
        for hash in &batch.delete_undo {
            state.undo.remove(hash);
        }
        for undo in batch.put_undo {
            state.undo.insert(undo.block_hash, undo);
        }
        state.tip = batch.tip;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorn_types::{Amount, ClaimHash, ConsensusParams, TxId};

    fn announcement(bounty: u8, vout: u32, claim: u8, post_height: u32, burn: u64) -> AnnouncementRecord {
        AnnouncementRecord {
            bounty_id: BountyId::new([bounty; 32]),
            claim_hash: ClaimHash::new([claim; 32]),
            outpoint: OutPoint::new(TxId::new([vout as u8; 32]), vout),
            burn: Amount::new(burn),
            post_height,
            block_hash: BlockHash::new([post_height as u8; 32]),
        }
    }

    #[test]
    fn duplicate_announcement_rejected() {
        let store = NullAnnouncementStore::new();
        let record = announcement(1, 0, 7, 10, 1_000_000);
        store.put_announcement(&record).unwrap();
        assert!(matches!(
            store.put_announcement(&record),
            Err(StoreError::DuplicateAnnouncement(_))
        ));
        assert_eq!(store.announcement_count().unwrap(), 1);
    }

    #[test]
    fn batch_with_a_duplicate_stores_nothing() {
        let store = NullAnnouncementStore::new();
        let existing = announcement(1, 0, 7, 10, 1_000_000);
        store.put_announcement(&existing).unwrap();

        let fresh = announcement(1, 1, 7, 11, 1_000_000);
        assert!(matches!(
            store.put_announcements(&[fresh.clone(), existing.clone()]),
            Err(StoreError::DuplicateAnnouncement(_))
        ));
        assert!(matches!(
            store.put_announcements(&[fresh.clone(), fresh.clone()]),
            Err(StoreError::DuplicateAnnouncement(_))
        ));
        assert_eq!(store.announcement_count().unwrap(), 1);

        store.put_announcements(&[fresh.clone()]).unwrap();
        store
            .delete_announcements(&[
                (existing.bounty_id, existing.outpoint),
                (fresh.bounty_id, fresh.outpoint),
            ])
            .unwrap();
        assert_eq!(store.announcement_count().unwrap(), 0);
    }

    #[test]
    fn find_usable_respects_window_and_claim() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        store.put_announcement(&announcement(1, 0, 7, 100, 1_000_000)).unwrap();
        let id = BountyId::new([1; 32]);
        let claim = ClaimHash::new([7; 32]);

        assert!(store.find_usable(&id, &claim, 104, &params).unwrap().is_none());
        assert!(store.find_usable(&id, &claim, 105, &params).unwrap().is_some());
        assert!(store.find_usable(&id, &claim, 204, &params).unwrap().is_some());
        assert!(store.find_usable(&id, &claim, 205, &params).unwrap().is_none());
        assert!(store
            .find_usable(&id, &ClaimHash::new([8; 32]), 110, &params)
            .unwrap()
            .is_none());
    }

    #[test]
    fn reannouncing_opens_a_new_window() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        store.put_announcement(&announcement(1, 0, 7, 100, 1_000_000)).unwrap();
        store.put_announcement(&announcement(1, 1, 7, 200, 1_000_000)).unwrap();
        let id = BountyId::new([1; 32]);
        let claim = ClaimHash::new([7; 32]);

        let found = store.find_usable(&id, &claim, 210, &params).unwrap().unwrap();
        assert_eq!(found.post_height, 200);
        assert!(store.find_usable(&id, &claim, 304, &params).unwrap().is_some());
    }

    #[test]
    fn low_burn_never_found() {
        let store = NullAnnouncementStore::new();
        let params = ConsensusParams::regtest();
        store.put_announcement(&announcement(1, 0, 7, 100, 999_999)).unwrap();
        let id = BountyId::new([1; 32]);
        let claim = ClaimHash::new([7; 32]);
        for h in 100..250 {
            assert!(store.find_usable(&id, &claim, h, &params).unwrap().is_none());
        }
    }

    #[test]
    fn index_commit_replaces_tip() {
        let store = NullIndexStore::new();
        let tip = IndexTip {
            hash: BlockHash::new([5; 32]),
            height: 5,
        };
        store
            .commit(IndexBatch {
                tip: Some(tip),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(store.tip().unwrap(), Some(tip));
        store.commit(IndexBatch::default()).unwrap();
        assert_eq!(store.tip().unwrap(), None);
    }
}
