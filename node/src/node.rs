//! The deadpool node: acceptance checks and block plumbing for a host ledger.

use std::sync::{Arc, PoisonError, RwLock};

use factorn_index::{spawn_indexer, ChainSource, IndexerHandle, QueryService};
use factorn_script::DeadpoolScript;
use factorn_store::{AnnouncementRecord, AnnouncementStore, HeightSnapshot, IndexStore, IndexTip};
use factorn_store_lmdb::LmdbEnvironment;
use factorn_types::{Block, BlockHash, ConsensusParams, OutPoint, Transaction};
use factorn_validation::{ClaimValidator, CoinView, ValidationReport};
use tokio::task::JoinHandle;

use crate::{NodeConfig, NodeError, NodeMetrics};

/// The last block the node connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainTip {
    pub hash: BlockHash,
    pub height: u32,
}

struct IndexerParts {
    handle: IndexerHandle,
    query: QueryService<dyn IndexStore>,
    task: JoinHandle<()>,
}

/// Deadpool state owned by a node.
///
/// The host must call [`DeadpoolNode::connect_block`] and
/// [`DeadpoolNode::disconnect_block`] in chain order. Validation always runs
/// against the announcement set as of the next block height.
pub struct DeadpoolNode {
    params: ConsensusParams,
    validator: ClaimValidator,
    announcements: Arc<dyn AnnouncementStore>,
    tip: RwLock<Option<ChainTip>>,
    indexer: Option<IndexerParts>,
    metrics: Arc<NodeMetrics>,
}

impl DeadpoolNode {
    /// Open the LMDB environment under `config.data_dir` and start the
    /// indexer if enabled. Must be called inside a tokio runtime.
    pub fn open(config: &NodeConfig, chain: Arc<dyn ChainSource>) -> Result<Self, NodeError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)?;
        let params = config.consensus_params();
        tracing::info!(
            network = %config.network,
            data_dir = %config.data_dir.display(),
            activation_height = params.activation_height,
            "opening deadpool node"
        );

        let index_store: Option<Arc<dyn IndexStore>> = config
            .enable_index
            .then(|| Arc::new(env.index_store()) as Arc<dyn IndexStore>);
        Self::with_stores(
            params,
            Arc::new(env.announcement_store()),
            index_store,
            chain,
            config.index_channel_capacity,
        )
    }

    /// Build a node over caller-supplied stores.
    ///
    /// With `index_store` set the indexer task is spawned, so this must then
    /// be called inside a tokio runtime.
    pub fn with_stores(
        params: ConsensusParams,
        announcements: Arc<dyn AnnouncementStore>,
        index_store: Option<Arc<dyn IndexStore>>,
        chain: Arc<dyn ChainSource>,
        index_channel_capacity: usize,
    ) -> Result<Self, NodeError> {
        let metrics = Arc::new(NodeMetrics::new()?);
        let indexer = index_store.map(|store| {
            let (handle, query, task) = spawn_indexer(
                store,
                chain,
                params.clone(),
                index_channel_capacity,
                metrics.index.clone(),
            );
            IndexerParts {
                handle,
                query,
                task,
            }
        });
        Ok(Self {
            validator: ClaimValidator::new(params.clone()),
            params,
            announcements,
            tip: RwLock::new(None),
            indexer,
            metrics,
        })
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn tip(&self) -> Option<ChainTip> {
        *self.tip.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Height the next block, and so any transaction accepted now, will have.
    pub fn next_height(&self) -> u32 {
        self.tip().map_or(0, |t| t.height.saturating_add(1))
    }

    pub fn announcements(&self) -> &Arc<dyn AnnouncementStore> {
        &self.announcements
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn query(&self) -> Option<&QueryService<dyn IndexStore>> {
        self.indexer.as_ref().map(|i| &i.query)
    }

    pub fn indexer(&self) -> Option<&IndexerHandle> {
        self.indexer.as_ref().map(|i| &i.handle)
    }

    /// Validate a transaction for inclusion in the next block.
    pub fn accept_transaction(
        &self,
        tx: &Transaction,
        coins: &impl CoinView,
    ) -> Result<ValidationReport, NodeError> {
        let height = self.next_height();
        let snapshot = HeightSnapshot::new(&*self.announcements, &self.params, height);
        let report = match self.validator.validate(tx, coins, height, &snapshot) {
            Ok(report) => report,
            Err(e) => {
                self.metrics.transactions_rejected.inc();
                tracing::debug!(txid = %tx.txid(), height, error = %e, "rejected transaction");
                return Err(e.into());
            }
        };
        self.metrics.transactions_accepted.inc();
        if report.is_claim() {
            tracing::info!(txid = %tx.txid(), height, claims = report.claims.len(), "accepted deadpool claim");
        }
        Ok(report)
    }

    /// Validate every transaction of a candidate block at its own height.
    ///
    /// Transactions are checked in parallel; `coins` must already hold any
    /// outputs created earlier in the block that later transactions spend.
    pub fn validate_block(
        &self,
        block: &Block,
        coins: &(impl CoinView + Sync),
    ) -> Result<Vec<ValidationReport>, NodeError> {
        let snapshot = HeightSnapshot::new(&*self.announcements, &self.params, block.height);
        self.validator
            .validate_many(&block.transactions, coins, block.height, &snapshot)
            .into_iter()
            .map(|r| r.map_err(NodeError::from))
            .collect()
    }

    /// Record a block the host has connected.
    ///
    /// Stores its announcements at the block height and forwards the block
    /// to the indexer. Returns the number of announcements stored.
    pub async fn connect_block(&self, block: Arc<Block>) -> Result<usize, NodeError> {
        if let Some(tip) = self.tip() {
            if tip.hash == block.hash {
                return Ok(0);
            }
            if tip.hash != block.prev_hash {
                return Err(NodeError::NotConnected {
                    block: block.hash,
                    tip: tip.hash,
                });
            }
        }

        let records = announcements_in(&block);
        self.announcements.put_announcements(&records)?;
        self.metrics.blocks_connected.inc();
        self.metrics.announcements_stored.inc_by(records.len() as u64);
        *self.tip.write().unwrap_or_else(PoisonError::into_inner) = Some(ChainTip {
            hash: block.hash,
            height: block.height,
        });
        tracing::debug!(hash = %block.hash, height = block.height, announcements = records.len(), "connected block");

        if let Some(indexer) = self.indexer() {
            indexer.block_connected(block).await?;
        }
        Ok(records.len())
    }

    /// Reverse [`DeadpoolNode::connect_block`] for the current tip.
    pub async fn disconnect_block(&self, block: Arc<Block>) -> Result<usize, NodeError> {
        let tip = self.tip();
        if tip.map(|t| t.hash) != Some(block.hash) {
            return Err(NodeError::NotTip {
                block: block.hash,
                tip: tip.map_or(BlockHash::ZERO, |t| t.hash),
            });
        }

        let keys: Vec<_> = announcements_in(&block)
            .into_iter()
            .map(|r| (r.bounty_id, r.outpoint))
            .collect();
        self.announcements.delete_announcements(&keys)?;
        self.metrics.blocks_disconnected.inc();
        *self.tip.write().unwrap_or_else(PoisonError::into_inner) =
            (!block.is_genesis()).then(|| ChainTip {
                hash: block.prev_hash,
                height: block.height - 1,
            });
        tracing::debug!(hash = %block.hash, height = block.height, announcements = keys.len(), "disconnected block");

        if let Some(indexer) = self.indexer() {
            indexer.block_disconnected(block).await?;
        }
        Ok(keys.len())
    }

    /// Wait for the indexer to catch up with every block handed to it.
    pub async fn sync_index(&self) -> Result<Option<IndexTip>, NodeError> {
        match self.indexer() {
            Some(indexer) => Ok(indexer.sync().await?),
            None => Ok(None),
        }
    }

    /// Stop the indexer and wait for it to drain.
    pub async fn shutdown(self) {
        if let Some(IndexerParts { handle, task, .. }) = self.indexer {
            drop(handle);
            if let Err(e) = task.await {
                tracing::error!(error = %e, "indexer task failed");
            }
        }
    }
}

/// Announcement outputs with a valid N, as stored for `block`.
fn announcements_in(block: &Block) -> Vec<AnnouncementRecord> {
    let mut records = Vec::new();
    for tx in &block.transactions {
        let txid = tx.txid();
        for (vout, output) in tx.outputs.iter().enumerate() {
            let Some(template) = DeadpoolScript::classify(&output.script_pubkey) else {
                continue;
            };
            let DeadpoolScript::Announce { n, claim_hash } = &template else {
                continue;
            };
            if factorn_bignum::check_deadpool_integer(n).is_err() {
                continue;
            }
            records.push(AnnouncementRecord {
                bounty_id: template.bounty_id(),
                claim_hash: *claim_hash,
                outpoint: OutPoint::new(txid, vout as u32),
                burn: output.value,
                post_height: block.height,
                block_hash: block.hash,
            });
        }
    }
    records
}
