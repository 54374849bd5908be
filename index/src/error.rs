use factorn_store::StoreError;
use factorn_types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("block {block} (parent {prev}) does not extend index tip {tip}")]
    ReorgInconsistency {
        block: BlockHash,
        prev: BlockHash,
        tip: BlockHash,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain source: {0}")]
    ChainSource(String),

    #[error("indexer channel closed")]
    ChannelClosed,

    #[error("no undo log for indexed block {0}")]
    MissingUndo(BlockHash),

    #[error("reorg deeper than {0} blocks")]
    ReorgTooDeep(u32),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
