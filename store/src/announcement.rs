//! Announcement storage: the height-indexed record of claim commitments.

use crate::StoreError;
use factorn_types::{Amount, AnnouncementState, BlockHash, BountyId, ClaimHash, ConsensusParams, OutPoint};
use serde::{Deserialize, Serialize};

/// One announcement output as confirmed on chain.
///
/// Re-announcing the same `(bounty_id, claim_hash)` creates a second record
/// with its own post height and window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub bounty_id: BountyId,
    pub claim_hash: ClaimHash,
    pub outpoint: OutPoint,
    /// Value locked (burned) in the unspendable announcement output.
    pub burn: Amount,
    pub post_height: u32,
    pub block_hash: BlockHash,
}

impl AnnouncementRecord {
    pub fn state_at(&self, params: &ConsensusParams, height: u32) -> AnnouncementState {
        params.announcement_state(self.post_height, self.burn, height)
    }

    pub fn is_usable_at(&self, params: &ConsensusParams, height: u32) -> bool {
        self.state_at(params, height) == AnnouncementState::Usable
    }
}

/// Trait for announcement storage.
///
/// Keys are `(bounty_id, outpoint)`. Records are written when the block
/// containing them connects and removed when it disconnects; they are never
/// modified in place.
pub trait AnnouncementStore: Send + Sync {
    /// Store an announcement. Fails with `Duplicate` if the outpoint is already present.
    fn put_announcement(&self, record: &AnnouncementRecord) -> Result<(), StoreError>;

    /// Remove an announcement (block disconnect).
    fn delete_announcement(&self, bounty_id: &BountyId, outpoint: &OutPoint) -> Result<(), StoreError>;

    /// Store every announcement of one block, or none of them.
    ///
    /// Fails with `Duplicate` if any outpoint is already present or repeated.
    fn put_announcements(&self, records: &[AnnouncementRecord]) -> Result<(), StoreError>;

    /// Remove every listed announcement, or none of them.
    fn delete_announcements(&self, keys: &[(BountyId, OutPoint)]) -> Result<(), StoreError>;

    /// Fetch a single announcement.
    fn get_announcement(
        &self,
        bounty_id: &BountyId,
        outpoint: &OutPoint,
    ) -> Result<AnnouncementRecord, StoreError>;

    /// All announcements for a bounty, in key order.
    fn announcements_for(&self, bounty_id: &BountyId) -> Result<Vec<AnnouncementRecord>, StoreError>;

    /// Number of stored announcements.
    fn announcement_count(&self) -> Result<u64, StoreError>;

    /// Announcements for `(bounty_id, claim_hash)` posted in `[min_height, max_height]`.
    fn claims_in_range(
        &self,
        bounty_id: &BountyId,
        claim_hash: &ClaimHash,
        min_height: u32,
        max_height: u32,
    ) -> Result<Vec<AnnouncementRecord>, StoreError> {
        Ok(self
            .announcements_for(bounty_id)?
            .into_iter()
            .filter(|a| {
                a.claim_hash == *claim_hash
                    && a.post_height >= min_height
                    && a.post_height <= max_height
            })
            .collect())
    }

    /// The first announcement usable at `height`, if any.
    fn find_usable(
        &self,
        bounty_id: &BountyId,
        claim_hash: &ClaimHash,
        height: u32,
        params: &ConsensusParams,
    ) -> Result<Option<AnnouncementRecord>, StoreError> {
        let Some((min, max)) = params.usable_post_heights(height) else {
            return Ok(None);
        };
        Ok(self
            .claims_in_range(bounty_id, claim_hash, min, max)?
            .into_iter()
            .find(|a| a.burn >= params.min_announce_burn))
    }
}

/// Read-only view of the announcement set at one validation height.
pub trait AnnouncementSnapshot {
    fn height(&self) -> u32;

    fn find_usable(
        &self,
        bounty_id: &BountyId,
        claim_hash: &ClaimHash,
    ) -> Result<Option<AnnouncementRecord>, StoreError>;
}

/// An [`AnnouncementSnapshot`] over any store, pinned to a height.
pub struct HeightSnapshot<'a, S: AnnouncementStore + ?Sized> {
    store: &'a S,
    params: &'a ConsensusParams,
    height: u32,
}

impl<'a, S: AnnouncementStore + ?Sized> HeightSnapshot<'a, S> {
    pub fn new(store: &'a S, params: &'a ConsensusParams, height: u32) -> Self {
        Self {
            store,
            params,
            height,
        }
    }
}

impl<S: AnnouncementStore + ?Sized> AnnouncementSnapshot for HeightSnapshot<'_, S> {
    fn height(&self) -> u32 {
        self.height
    }

    fn find_usable(
        &self,
        bounty_id: &BountyId,
        claim_hash: &ClaimHash,
    ) -> Result<Option<AnnouncementRecord>, StoreError> {
        self.store
            .find_usable(bounty_id, claim_hash, self.height, self.params)
    }
}
