//! FactorN deadpool node wiring.
//!
//! Ties the deadpool pieces to a host ledger:
//! - Validates transactions against the announcement set at the next height
//! - Persists announcements as blocks connect and removes them on disconnect
//! - Feeds the bounty indexer and exposes its query service

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::{ConsensusOverrides, NodeConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::{ChainTip, DeadpoolNode};
