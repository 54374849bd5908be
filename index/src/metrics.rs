//! Prometheus counters for the indexer worker.

use prometheus::{register_int_counter_with_registry, IntCounter, Opts, Registry};

/// Counters kept by the indexer worker, registered in a caller's [`Registry`].
#[derive(Clone)]
pub struct IndexerMetrics {
    /// Connected blocks folded into the index, reorg recoveries included.
    pub blocks_applied: IntCounter,
    /// Disconnected blocks reversed.
    pub blocks_undone: IntCounter,
    /// Connected blocks that did not extend the index tip.
    pub reorgs: IntCounter,
    /// Events that failed and were dropped.
    pub errors: IntCounter,
}

impl IndexerMetrics {
    /// Register every indexer counter in `registry`.
    ///
    /// Fails if the registry already holds counters with these names.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_applied = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_index_blocks_applied_total",
                "Total connected blocks folded into the deadpool index"
            ),
            registry
        )?;

        let blocks_undone = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_index_blocks_undone_total",
                "Total disconnected blocks reversed in the deadpool index"
            ),
            registry
        )?;

        let reorgs = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_index_reorgs_total",
                "Total connected blocks that forced the index onto another branch"
            ),
            registry
        )?;

        let errors = register_int_counter_with_registry!(
            Opts::new(
                "deadpool_index_errors_total",
                "Total indexer events that failed"
            ),
            registry
        )?;

        Ok(Self {
            blocks_applied,
            blocks_undone,
            reorgs,
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_registry() {
        let registry = Registry::new();
        let metrics = IndexerMetrics::register(&registry).unwrap();
        metrics.blocks_applied.inc_by(3);
        metrics.errors.inc();

        let families = registry.gather();
        let value = |name: &str| {
            families
                .iter()
                .find(|f| f.get_name() == name)
                .map(|f| f.get_metric()[0].get_counter().get_value())
        };
        assert_eq!(value("deadpool_index_blocks_applied_total"), Some(3.0));
        assert_eq!(value("deadpool_index_errors_total"), Some(1.0));
        assert_eq!(value("deadpool_index_reorgs_total"), Some(0.0));
    }

    #[test]
    fn double_registration_is_an_error() {
        let registry = Registry::new();
        IndexerMetrics::register(&registry).unwrap();
        assert!(IndexerMetrics::register(&registry).is_err());
    }
}
