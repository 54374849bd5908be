//! Access to the host's block tree, used to find the fork point on a reorg.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use factorn_types::{Block, BlockHash};

/// Blocks known to the host, on any branch.
pub trait ChainSource: Send + Sync {
    fn block(&self, hash: &BlockHash) -> Option<Arc<Block>>;
}

/// A [`ChainSource`] over blocks held in memory.
#[derive(Default)]
pub struct MemoryChain {
    blocks: RwLock<HashMap<BlockHash, Arc<Block>>>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block: Arc<Block>) {
        self.blocks.write().unwrap_or_else(PoisonError::into_inner).insert(block.hash, block);
    }

    pub fn len(&self) -> usize {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChainSource for MemoryChain {
    fn block(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner).get(hash).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block, genesis};

    #[test]
    fn poisoned_lock_still_serves_blocks() {
        let chain = Arc::new(MemoryChain::new());
        chain.insert(genesis());

        let poisoner = Arc::clone(&chain);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.blocks.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(chain.blocks.is_poisoned());

        let b1 = block(0, 1, genesis().hash, Vec::new());
        chain.insert(b1.clone());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.block(&b1.hash), Some(b1));
    }
}
