use factorn_types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("validation error: {0}")]
    Validation(#[from] factorn_validation::ValidationError),

    #[error("indexer error: {0}")]
    Indexer(#[from] factorn_index::IndexerError),

    #[error("store error: {0}")]
    Store(#[from] factorn_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] factorn_store_lmdb::LmdbError),

    #[error("block {block} does not connect to tip {tip}")]
    NotConnected { block: BlockHash, tip: BlockHash },

    #[error("block {block} is not the tip {tip}")]
    NotTip { block: BlockHash, tip: BlockHash },

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
