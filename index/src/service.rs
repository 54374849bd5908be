//! The indexer as a background task.
//!
//! One blocking worker owns the [`Indexer`] and drains a bounded channel of
//! chain events in order. Each event is applied under the write side of the
//! barrier shared with [`QueryService`].

use std::sync::{Arc, PoisonError, RwLock};

use factorn_store::{IndexStore, IndexTip};
use factorn_types::{Block, ConsensusParams};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{BlockStats, ChainSource, Indexer, IndexerError, IndexerMetrics, QueryService};

/// A chain change for the indexer, in host order.
#[derive(Debug)]
pub enum IndexEvent {
    Connected(Arc<Block>),
    Disconnected(Arc<Block>),
    /// Answered with the index tip once every earlier event is processed.
    Sync(oneshot::Sender<Option<IndexTip>>),
}

/// Sending side of the indexer. Cheap to clone.
#[derive(Clone)]
pub struct IndexerHandle {
    tx: mpsc::Sender<IndexEvent>,
    metrics: IndexerMetrics,
}

impl IndexerHandle {
    pub async fn block_connected(&self, block: Arc<Block>) -> Result<(), IndexerError> {
        self.send(IndexEvent::Connected(block)).await
    }

    pub async fn block_disconnected(&self, block: Arc<Block>) -> Result<(), IndexerError> {
        self.send(IndexEvent::Disconnected(block)).await
    }

    /// Wait until every event sent so far has been processed.
    pub async fn sync(&self) -> Result<Option<IndexTip>, IndexerError> {
        let (reply, rx) = oneshot::channel();
        self.send(IndexEvent::Sync(reply)).await?;
        rx.await.map_err(|_| IndexerError::ChannelClosed)
    }

    pub fn metrics(&self) -> &IndexerMetrics {
        &self.metrics
    }

    async fn send(&self, event: IndexEvent) -> Result<(), IndexerError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| IndexerError::ChannelClosed)
    }
}

/// Start the indexer worker over `store`.
///
/// The worker stops once every [`IndexerHandle`] is dropped. Failures are
/// logged and counted in `metrics`; the index is a read model and never
/// blocks the host.
pub fn spawn_indexer<S>(
    store: Arc<S>,
    chain: Arc<dyn ChainSource>,
    params: ConsensusParams,
    capacity: usize,
    metrics: IndexerMetrics,
) -> (IndexerHandle, QueryService<S>, JoinHandle<()>)
where
    S: IndexStore + ?Sized + 'static,
{
    let (tx, mut rx) = mpsc::channel(capacity.max(1));
    let barrier = Arc::new(RwLock::new(()));
    let query = QueryService::with_barrier(Arc::clone(&store), Arc::clone(&barrier), params);
    let indexer = Indexer::new(store);

    let worker_metrics = metrics.clone();
    let task = tokio::task::spawn_blocking(move || {
        tracing::info!("deadpool indexer started");
        while let Some(event) = rx.blocking_recv() {
            let _guard = barrier.write().unwrap_or_else(PoisonError::into_inner);
            handle_event(&indexer, &*chain, &worker_metrics, event);
        }
        tracing::info!("deadpool indexer stopped");
    });

    (IndexerHandle { tx, metrics }, query, task)
}

fn handle_event<S: IndexStore + ?Sized>(
    indexer: &Indexer<S>,
    chain: &dyn ChainSource,
    metrics: &IndexerMetrics,
    event: IndexEvent,
) {
    let result = match event {
        IndexEvent::Connected(block) => connect(indexer, chain, metrics, &block).map(|_| {
            metrics.blocks_applied.inc();
        }),
        IndexEvent::Disconnected(block) => indexer.undo(&block).map(|_| {
            metrics.blocks_undone.inc();
        }),
        IndexEvent::Sync(reply) => indexer.tip().map(|tip| {
            let _ = reply.send(tip);
        }),
    };
    if let Err(e) = result {
        metrics.errors.inc();
        tracing::error!(error = %e, "deadpool indexer event failed");
    }
}

fn connect<S: IndexStore + ?Sized>(
    indexer: &Indexer<S>,
    chain: &dyn ChainSource,
    metrics: &IndexerMetrics,
    block: &Block,
) -> Result<BlockStats, IndexerError> {
    match indexer.apply(block) {
        Err(IndexerError::ReorgInconsistency { tip, .. }) => {
            metrics.reorgs.inc();
            tracing::warn!(hash = %block.hash, %tip, "block does not extend index tip, recovering");
            indexer.reconnect(block, chain)
        }
        other => other,
    }
}
