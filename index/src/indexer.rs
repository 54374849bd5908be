//! Block-by-block maintenance of the bounty records.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use factorn_script::{parse_claim_script_sig, DeadpoolScript};
use factorn_store::{
    AnnouncementRecord, BlockUndo, BountyRecord, ClaimRecord, EntryRecord, IndexBatch, IndexStore,
    IndexTip, StoreError, UndoOp,
};
use factorn_types::{Block, BlockHash, BountyId, OutPoint};

use crate::staging::StagedStore;
use crate::{ChainSource, IndexerError};

/// Deepest fork the indexer will unwind on its own.
pub const MAX_REORG_DEPTH: u32 = 1_000;

/// What one apply or undo changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockStats {
    pub entries: usize,
    pub announcements: usize,
    pub claims: usize,
}

/// Folds blocks into an [`IndexStore`].
///
/// Not internally synchronised: callers must serialise `apply` and `undo`
/// (the indexer service is the only writer).
pub struct Indexer<S: IndexStore + ?Sized> {
    store: Arc<S>,
}

impl<S: IndexStore + ?Sized> Clone for Indexer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: IndexStore + ?Sized> Indexer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn tip(&self) -> Result<Option<IndexTip>, IndexerError> {
        Ok(self.store.tip()?)
    }

    pub fn is_indexed(&self, hash: &BlockHash) -> Result<bool, IndexerError> {
        is_indexed(&*self.store, hash)
    }

    /// Fold a connected block into the index.
    ///
    /// Applying a block that is already indexed is a no-op. A block whose
    /// parent is not the current tip fails with `ReorgInconsistency`; see
    /// [`Indexer::reconnect`].
    pub fn apply(&self, block: &Block) -> Result<BlockStats, IndexerError> {
        apply_block(&*self.store, block)
    }

    /// Reverse a disconnected block.
    ///
    /// Blocks that were never indexed are ignored. If `block` is below the
    /// tip, every indexed block above it is unwound first, in one commit.
    pub fn undo(&self, block: &Block) -> Result<BlockStats, IndexerError> {
        if !self.is_indexed(&block.hash)? {
            tracing::debug!(hash = %block.hash, "disconnect of unindexed block ignored");
            return Ok(BlockStats::default());
        }
        let staged = StagedStore::new(&*self.store);
        let mut total = BlockStats::default();
        loop {
            let (undone, stats) = undo_tip(&staged)?;
            total.entries += stats.entries;
            total.announcements += stats.announcements;
            total.claims += stats.claims;
            if undone == block.hash {
                break;
            }
        }
        self.store.commit(staged.into_batch()?)?;
        Ok(total)
    }

    /// Apply `block` even when it sits on a branch the index has not followed.
    ///
    /// Walks the new branch back through `chain` to the first block the index
    /// already holds, unwinds the index to it, then applies the branch in
    /// order, ending with `block`. The whole switch lands in one commit: on
    /// any error the index is left exactly as it was.
    pub fn reconnect(
        &self,
        block: &Block,
        chain: &dyn ChainSource,
    ) -> Result<BlockStats, IndexerError> {
        let mut branch: Vec<Arc<Block>> = Vec::new();
        let mut cursor = block.prev_hash;
        let mut at_genesis = block.is_genesis();
        while !at_genesis && !self.is_indexed(&cursor)? {
            if branch.len() as u32 >= MAX_REORG_DEPTH {
                return Err(IndexerError::ReorgTooDeep(MAX_REORG_DEPTH));
            }
            let parent = chain
                .block(&cursor)
                .ok_or_else(|| IndexerError::ChainSource(format!("block {cursor} not available")))?;
            cursor = parent.prev_hash;
            at_genesis = parent.is_genesis();
            branch.push(parent);
        }
        let fork_point = (!at_genesis).then_some(cursor);

        // Undo logs only exist on the indexed chain, so the fork height
        // measures exactly how many blocks must come off.
        let depth = match (self.store.tip()?, fork_point) {
            (None, _) => 0,
            (Some(tip), Some(fork)) => {
                let fork_height = self
                    .store
                    .get_undo(&fork)?
                    .ok_or(IndexerError::MissingUndo(fork))?
                    .height;
                tip.height.saturating_sub(fork_height)
            }
            (Some(tip), None) => tip.height + 1,
        };
        if depth > MAX_REORG_DEPTH {
            return Err(IndexerError::ReorgTooDeep(MAX_REORG_DEPTH));
        }

        let staged = StagedStore::new(&*self.store);
        while let Some(tip) = staged.tip()? {
            if Some(tip.hash) == fork_point {
                break;
            }
            undo_tip(&staged)?;
        }
        for parent in branch.iter().rev() {
            apply_block(&staged, parent)?;
        }
        let stats = apply_block(&staged, block)?;
        self.store.commit(staged.into_batch()?)?;

        tracing::warn!(
            hash = %block.hash,
            height = block.height,
            undone = depth,
            reapplied = branch.len(),
            "index reorg"
        );
        Ok(stats)
    }
}

fn is_indexed<S: IndexStore + ?Sized>(store: &S, hash: &BlockHash) -> Result<bool, IndexerError> {
    Ok(store.get_undo(hash)?.is_some())
}

fn apply_block<S: IndexStore + ?Sized>(store: &S, block: &Block) -> Result<BlockStats, IndexerError> {
    if is_indexed(store, &block.hash)? {
        tracing::debug!(hash = %block.hash, height = block.height, "block already indexed");
        return Ok(BlockStats::default());
    }
    if let Some(tip) = store.tip()? {
        if tip.hash != block.prev_hash {
            return Err(IndexerError::ReorgInconsistency {
                block: block.hash,
                prev: block.prev_hash,
                tip: tip.hash,
            });
        }
    }

    let mut pending = PendingBlock::new(store);
    // Genesis outputs are unspendable; only the tip moves.
    if !block.is_genesis() {
        pending.fold(block)?;
    }
    let stats = pending.stats;
    store.commit(pending.into_batch(block))?;

    tracing::info!(
        hash = %block.hash,
        height = block.height,
        entries = stats.entries,
        announcements = stats.announcements,
        claims = stats.claims,
        "indexed block"
    );
    Ok(stats)
}

fn undo_tip<S: IndexStore + ?Sized>(store: &S) -> Result<(BlockHash, BlockStats), IndexerError> {
    let tip = store
        .tip()?
        .ok_or_else(|| StoreError::Corruption("undo with empty index tip".into()))?;
    let undo = store
        .get_undo(&tip.hash)?
        .ok_or(IndexerError::MissingUndo(tip.hash))?;

    let mut records: BTreeMap<BountyId, BountyRecord> = BTreeMap::new();
    let mut removed: BTreeSet<BountyId> = BTreeSet::new();
    let mut batch = IndexBatch::default();
    let mut stats = BlockStats::default();

    for op in undo.ops.iter().rev() {
        match op {
            UndoOp::RecordCreated { bounty_id } => {
                records.remove(bounty_id);
                removed.insert(*bounty_id);
            }
            UndoOp::EntryAdded {
                bounty_id,
                outpoint,
            } => {
                let record = load(store, &mut records, bounty_id)?;
                record.entries.retain(|e| e.outpoint != *outpoint);
                batch.delete_entry_owners.push(*outpoint);
                stats.entries += 1;
            }
            UndoOp::AnnouncementAdded {
                bounty_id,
                outpoint,
            } => {
                let record = load(store, &mut records, bounty_id)?;
                record.announcements.retain(|a| a.outpoint != *outpoint);
                stats.announcements += 1;
            }
            UndoOp::EntryClaimed {
                bounty_id,
                outpoint,
            } => {
                let record = load(store, &mut records, bounty_id)?;
                if let Some(entry) = record.entry_mut(outpoint) {
                    entry.claim = None;
                }
                stats.claims += 1;
            }
        }
    }

    batch.put_records = records.into_values().collect();
    batch.delete_records = removed.into_iter().collect();
    batch.delete_undo = vec![undo.block_hash];
    batch.tip = (undo.height > 0).then(|| IndexTip {
        hash: undo.prev_hash,
        height: undo.height - 1,
    });
    store.commit(batch)?;

    tracing::info!(
        hash = %undo.block_hash,
        height = undo.height,
        entries = stats.entries,
        announcements = stats.announcements,
        claims = stats.claims,
        "unindexed block"
    );
    Ok((undo.block_hash, stats))
}

fn load<'a, S: IndexStore + ?Sized>(
    store: &S,
    records: &'a mut BTreeMap<BountyId, BountyRecord>,
    bounty_id: &BountyId,
) -> Result<&'a mut BountyRecord, StoreError> {
    if !records.contains_key(bounty_id) {
        let record = store
            .get_record(bounty_id)?
            .ok_or_else(|| StoreError::Corruption(format!("missing bounty record {bounty_id}")))?;
        records.insert(*bounty_id, record);
    }
    records
        .get_mut(bounty_id)
        .ok_or_else(|| StoreError::RecordNotFound(*bounty_id))
}

/// Changes accumulated while folding one block, not yet committed.
struct PendingBlock<'s, S: IndexStore + ?Sized> {
    store: &'s S,
    records: BTreeMap<BountyId, BountyRecord>,
    /// Entry outpoints created in this block.
    new_owners: HashMap<OutPoint, BountyId>,
    ops: Vec<UndoOp>,
    stats: BlockStats,
}

impl<'s, S: IndexStore + ?Sized> PendingBlock<'s, S> {
    fn new(store: &'s S) -> Self {
        Self {
            store,
            records: BTreeMap::new(),
            new_owners: HashMap::new(),
            ops: Vec::new(),
            stats: BlockStats::default(),
        }
    }

    fn fold(&mut self, block: &Block) -> Result<(), StoreError> {
        for tx in &block.transactions {
            let txid = tx.txid();
            for (vout, output) in tx.outputs.iter().enumerate() {
                let Some(template) = DeadpoolScript::classify(&output.script_pubkey) else {
                    continue;
                };
                if let Err(e) = factorn_bignum::check_deadpool_integer(template.n()) {
                    tracing::warn!(%txid, vout, error = %e, "skipping deadpool output with invalid N");
                    continue;
                }
                let outpoint = OutPoint::new(txid, vout as u32);
                let bounty_id = template.bounty_id();
                let record = self.record_or_create(bounty_id, template.n())?;
                match template {
                    DeadpoolScript::Entry { .. } => {
                        record.entries.push(EntryRecord {
                            outpoint,
                            amount: output.value,
                            height: block.height,
                            block_hash: block.hash,
                            claim: None,
                        });
                        self.new_owners.insert(outpoint, bounty_id);
                        self.ops.push(UndoOp::EntryAdded {
                            bounty_id,
                            outpoint,
                        });
                        self.stats.entries += 1;
                        tracing::debug!(%bounty_id, %outpoint, height = block.height, "found entry");
                    }
                    DeadpoolScript::Announce { claim_hash, .. } => {
                        record.announcements.push(AnnouncementRecord {
                            bounty_id,
                            claim_hash,
                            outpoint,
                            burn: output.value,
                            post_height: block.height,
                            block_hash: block.hash,
                        });
                        self.ops.push(UndoOp::AnnouncementAdded {
                            bounty_id,
                            outpoint,
                        });
                        self.stats.announcements += 1;
                        tracing::debug!(%bounty_id, %claim_hash, height = block.height, "found announcement");
                    }
                }
            }

            for input in &tx.inputs {
                let owner = match self.new_owners.get(&input.prevout) {
                    Some(id) => Some(*id),
                    None => self.store.entry_owner(&input.prevout)?,
                };
                let Some(bounty_id) = owner else {
                    continue;
                };
                let record = load(self.store, &mut self.records, &bounty_id)?;
                let Some(entry) = record.entry_mut(&input.prevout) else {
                    return Err(StoreError::Corruption(format!(
                        "entry {} missing from bounty {bounty_id}",
                        input.prevout
                    )));
                };
                if entry.is_claimed() {
                    continue;
                }
                let factor = parse_claim_script_sig(&input.script_sig).map(|w| w.factor);
                if factor.is_none() {
                    tracing::warn!(
                        %bounty_id,
                        %txid,
                        outpoint = %input.prevout,
                        "entry spent without a claim witness, factor not recorded"
                    );
                }
                entry.claim = Some(ClaimRecord {
                    txid,
                    block_hash: block.hash,
                    height: block.height,
                    factor,
                });
                self.ops.push(UndoOp::EntryClaimed {
                    bounty_id,
                    outpoint: input.prevout,
                });
                self.stats.claims += 1;
                tracing::debug!(%bounty_id, %txid, height = block.height, "found claim");
            }
        }
        Ok(())
    }

    fn record_or_create(
        &mut self,
        bounty_id: BountyId,
        n: &[u8],
    ) -> Result<&mut BountyRecord, StoreError> {
        if !self.records.contains_key(&bounty_id) {
            let record = match self.store.get_record(&bounty_id)? {
                Some(record) => record,
                None => {
                    self.ops.push(UndoOp::RecordCreated { bounty_id });
                    BountyRecord::new(bounty_id, n.to_vec())
                }
            };
            self.records.insert(bounty_id, record);
        }
        load(self.store, &mut self.records, &bounty_id)
    }

    fn into_batch(self, block: &Block) -> IndexBatch {
        IndexBatch {
            put_records: self.records.into_values().collect(),
            put_entry_owners: self.new_owners.into_iter().collect(),
            put_undo: vec![BlockUndo {
                block_hash: block.hash,
                prev_hash: block.prev_hash,
                height: block.height,
                ops: self.ops,
            }],
            tip: Some(IndexTip {
                hash: block.hash,
                height: block.height,
            }),
            ..IndexBatch::default()
        }
    }
}
