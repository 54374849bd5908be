//! Prometheus metrics for the deadpool node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] holding the node's own
//! counters and the indexer's, ready to be encoded in the Prometheus text
//! exposition format by whatever endpoint the host exposes.

use factorn_index::IndexerMetrics;
use prometheus::{register_int_counter_with_registry, IntCounter, Opts, Registry};

pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Transactions that passed deadpool validation.
    pub transactions_accepted: IntCounter,
    /// Transactions rejected by deadpool validation.
    pub transactions_rejected: IntCounter,
    pub blocks_connected: IntCounter,
    pub blocks_disconnected: IntCounter,
    /// Announcements persisted from connected blocks.
    pub announcements_stored: IntCounter,

    /// Counters of the indexer worker, in the same registry.
    pub index: IndexerMetrics,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let transactions_accepted = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_transactions_accepted_total",
                "Total transactions accepted by deadpool validation"
            ),
            registry
        )?;

        let transactions_rejected = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_transactions_rejected_total",
                "Total transactions rejected by deadpool validation"
            ),
            registry
        )?;

        let blocks_connected = register_int_counter_with_registry!(
            Opts::new("deadpool_blocks_connected_total", "Total blocks connected"),
            registry
        )?;

        let blocks_disconnected = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_blocks_disconnected_total",
                "Total blocks disconnected"
            ),
            registry
        )?;

        let announcements_stored = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_announcements_stored_total",
                "Total announcements stored from connected blocks"
            ),
            registry
        )?;

        let index = IndexerMetrics::register(&registry)?;

        Ok(Self {
            registry,
            transactions_accepted,
            transactions_rejected,
            blocks_connected,
            blocks_disconnected,
            announcements_stored,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_registry_holds_node_and_index_counters() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.transactions_rejected.inc();
        metrics.index.reorgs.inc();

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"deadpool_transactions_rejected_total".to_string()));
        assert!(names.contains(&"deadpool_index_reorgs_total".to_string()));
        assert_eq!(metrics.transactions_rejected.get(), 1);
    }
}
