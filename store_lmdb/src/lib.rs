//! LMDB storage backend for the FactorN deadpool.
//!
//! Implements the storage traits from `factorn-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.

pub mod announcement;
pub mod environment;
pub mod error;
pub mod index;

pub use announcement::LmdbAnnouncementStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use index::LmdbIndexStore;
