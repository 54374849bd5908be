//! Abstract storage traits for the FactorN deadpool.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod announcement;
pub mod error;
pub mod index;

pub use announcement::{AnnouncementRecord, AnnouncementSnapshot, AnnouncementStore, HeightSnapshot};
pub use error::StoreError;
pub use index::{
    BlockUndo, BountyRecord, ClaimRecord, EntryRecord, IndexBatch, IndexStore, IndexTip, UndoOp,
};
