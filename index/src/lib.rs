//! The deadpool index: a rebuildable read model of every N ever offered.
//!
//! - [`Indexer`] folds connected blocks into per-bounty aggregates and
//!   reverses them on disconnect using per-block undo logs.
//! - [`spawn_indexer`] runs it as the single writer, fed by an ordered
//!   event channel.
//! - [`QueryService`] answers lookups and listings behind a read barrier so
//!   no reader observes half an applied block.
//!
//! The index is never on the acceptance path; losing it only loses queries.

pub mod chain;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod query;
pub mod service;
mod staging;

#[cfg(test)]
pub(crate) mod test_support;

pub use chain::{ChainSource, MemoryChain};
pub use error::IndexerError;
pub use indexer::{BlockStats, Indexer, MAX_REORG_DEPTH};
pub use query::{
    AnnouncementView, BountySummary, BountyView, EntryView, ListOptions, QueryService,
};
pub use metrics::IndexerMetrics;
pub use service::{spawn_indexer, IndexEvent, IndexerHandle};
