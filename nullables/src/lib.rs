//! Nullable infrastructure for deterministic testing.
//!
//! The storage traits from `factorn-store` are implemented here over
//! in-memory maps. These implementations:
//! - Return deterministic values (ordered maps, stable iteration)
//! - Can be inspected programmatically
//! - Never touch the filesystem
//!
//! Usage: swap the LMDB stores for nullables in tests.

pub mod store;

pub use store::{NullAnnouncementStore, NullIndexStore};
