use factorn_types::{BountyId, OutPoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("announcement {0} is already stored")]
    DuplicateAnnouncement(OutPoint),

    #[error("announcement {0} not found")]
    AnnouncementNotFound(OutPoint),

    #[error("bounty record {0} not found")]
    RecordNotFound(BountyId),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("index is inconsistent: {0}")]
    Corruption(String),
}
