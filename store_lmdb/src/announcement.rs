//! LMDB implementation of AnnouncementStore.
//!
//! One database:
//! - `announcements`: composite key `bounty_id(32) ++ txid(32) ++ vout_be(4)`
//!   → bincode `AnnouncementRecord`. A prefix scan on the bounty id yields every
//!   announcement for one N.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use factorn_store::{AnnouncementRecord, AnnouncementStore, StoreError};
use factorn_types::{BountyId, OutPoint};

use crate::LmdbError;

pub struct LmdbAnnouncementStore {
    pub(crate) env: Arc<Env>,
    pub(crate) announcements_db: Database<Bytes, Bytes>,
}

/// Build the 68-byte key `bounty_id ++ txid ++ vout_be`.
pub(crate) fn announcement_key(bounty_id: &BountyId, outpoint: &OutPoint) -> [u8; 68] {
    let mut key = [0u8; 68];
    key[..32].copy_from_slice(bounty_id.as_bytes());
    key[32..64].copy_from_slice(outpoint.txid.as_bytes());
    key[64..].copy_from_slice(&outpoint.vout.to_be_bytes());
    key
}

impl AnnouncementStore for LmdbAnnouncementStore {
    fn put_announcement(&self, record: &AnnouncementRecord) -> Result<(), StoreError> {
        let key = announcement_key(&record.bounty_id, &record.outpoint);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .announcements_db
            .get(&wtxn, &key[..])
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::DuplicateAnnouncement(record.outpoint));
        }
        let value = bincode::serialize(record).map_err(LmdbError::from)?;
        self.announcements_db
            .put(&mut wtxn, &key[..], &value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(
            bounty_id = %record.bounty_id,
            outpoint = %record.outpoint,
            height = record.post_height,
            "stored announcement"
        );
        Ok(())
    }

    fn delete_announcement(&self, bounty_id: &BountyId, outpoint: &OutPoint) -> Result<(), StoreError> {
        let key = announcement_key(bounty_id, outpoint);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.announcements_db
            .delete(&mut wtxn, &key[..])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_announcements(&self, records: &[AnnouncementRecord]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for record in records {
            let key = announcement_key(&record.bounty_id, &record.outpoint);
            if self
                .announcements_db
                .get(&wtxn, &key[..])
                .map_err(LmdbError::from)?
                .is_some()
            {
                // Dropping the write transaction aborts the earlier puts.
                return Err(StoreError::DuplicateAnnouncement(record.outpoint));
            }
            let value = bincode::serialize(record).map_err(LmdbError::from)?;
            self.announcements_db
                .put(&mut wtxn, &key[..], &value)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::debug!(count = records.len(), "stored announcements");
        Ok(())
    }

    fn delete_announcements(&self, keys: &[(BountyId, OutPoint)]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for (bounty_id, outpoint) in keys {
            self.announcements_db
                .delete(&mut wtxn, &announcement_key(bounty_id, outpoint)[..])
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_announcement(
        &self,
        bounty_id: &BountyId,
        outpoint: &OutPoint,
    ) -> Result<AnnouncementRecord, StoreError> {
        let key = announcement_key(bounty_id, outpoint);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .announcements_db
            .get(&rtxn, &key[..])
            .map_err(LmdbError::from)?
            .ok_or(StoreError::AnnouncementNotFound(*outpoint))?;
        Ok(bincode::deserialize(bytes).map_err(LmdbError::from)?)
    }

    fn announcements_for(&self, bounty_id: &BountyId) -> Result<Vec<AnnouncementRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .announcements_db
            .prefix_iter(&rtxn, &bounty_id.as_bytes()[..])
            .map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_, bytes) = item.map_err(LmdbError::from)?;
            let record: AnnouncementRecord =
                bincode::deserialize(bytes).map_err(LmdbError::from)?;
            results.push(record);
        }
        Ok(results)
    }

    fn announcement_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .announcements_db
            .len(&rtxn)
            .map_err(LmdbError::from)?)
    }
}
