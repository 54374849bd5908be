//! Read side of the index.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use factorn_script::{entry_script, ClaimInput};
use factorn_store::{AnnouncementRecord, BountyRecord, EntryRecord, IndexStore, IndexTip};
use factorn_types::{AnnouncementState, BountyId, ConsensusParams};
use serde::{Deserialize, Serialize};

use crate::IndexerError;

/// How often [`QueryService::wait_for_record`] polls.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Filters for [`QueryService::list_records`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    pub limit: usize,
    pub offset: usize,
    /// Also list fully-claimed records, counting their claimed entries.
    pub include_historical: bool,
    /// List records that already have announcements.
    pub include_announced: bool,
    /// Only records with an entry confirmed at or above this height.
    pub entries_since_height: Option<u32>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            offset: 0,
            include_historical: false,
            include_announced: true,
            entries_since_height: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountySummary {
    pub deadpoolid: String,
    /// Unclaimed total, in coins.
    pub bounty: String,
    pub entries: usize,
    pub announcements: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub txid: String,
    pub vout: u32,
    pub amount: String,
    pub height: u32,
    pub claimed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_blockhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_txid: Option<String>,
    /// Revealed factor, decimal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl From<&EntryRecord> for EntryView {
    fn from(entry: &EntryRecord) -> Self {
        let claim = entry.claim.as_ref();
        Self {
            txid: entry.outpoint.txid.to_string(),
            vout: entry.outpoint.vout,
            amount: entry.amount.to_string(),
            height: entry.height,
            claimed: claim.is_some(),
            claim_height: claim.map(|c| c.height),
            claim_blockhash: claim.map(|c| c.block_hash.to_string()),
            claim_txid: claim.map(|c| c.txid.to_string()),
            solution: claim
                .and_then(|c| c.factor.as_deref())
                .map(|f| factorn_bignum::to_decimal(&factorn_bignum::decode_lenient(f))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementView {
    pub txid: String,
    pub vout: u32,
    pub burn_amount: String,
    pub height: u32,
    pub claim_hash: String,
    /// State for a transaction in the block after the index tip.
    pub state: AnnouncementState,
}

impl AnnouncementView {
    fn new(record: &AnnouncementRecord, params: &ConsensusParams, height: u32) -> Self {
        Self {
            txid: record.outpoint.txid.to_string(),
            vout: record.outpoint.vout,
            burn_amount: record.burn.to_string(),
            height: record.post_height,
            claim_hash: record.claim_hash.to_string(),
            state: record.state_at(params, height),
        }
    }
}

/// Full detail for one N.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyView {
    /// N, decimal.
    pub n: String,
    pub bits: u64,
    pub deadpoolid: String,
    pub bounty: String,
    pub entries: Vec<EntryView>,
    pub announcements: Vec<AnnouncementView>,
}

/// Answers index queries.
///
/// Every query holds the read side of the barrier the writer takes per
/// block, so results never mix states from before and after one block.
/// Results may lag the host chain; use [`QueryService::wait_for_record`] to
/// poll for catch-up.
pub struct QueryService<S: IndexStore + ?Sized> {
    store: Arc<S>,
    barrier: Arc<RwLock<()>>,
    params: ConsensusParams,
}

impl<S: IndexStore + ?Sized> Clone for QueryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            barrier: Arc::clone(&self.barrier),
            params: self.params.clone(),
        }
    }
}

impl<S: IndexStore + ?Sized> QueryService<S> {
    pub fn new(store: Arc<S>, params: ConsensusParams) -> Self {
        Self::with_barrier(store, Arc::new(RwLock::new(())), params)
    }

    pub(crate) fn with_barrier(
        store: Arc<S>,
        barrier: Arc<RwLock<()>>,
        params: ConsensusParams,
    ) -> Self {
        Self {
            store,
            barrier,
            params,
        }
    }

    pub fn tip(&self) -> Result<Option<IndexTip>, IndexerError> {
        let _guard = self.barrier.read().unwrap_or_else(PoisonError::into_inner);
        Ok(self.store.tip()?)
    }

    pub fn get_record(&self, bounty_id: &BountyId) -> Result<Option<BountyRecord>, IndexerError> {
        let _guard = self.barrier.read().unwrap_or_else(PoisonError::into_inner);
        Ok(self.store.get_record(bounty_id)?)
    }

    pub fn get_view(&self, bounty_id: &BountyId) -> Result<Option<BountyView>, IndexerError> {
        let _guard = self.barrier.read().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = self.store.get_record(bounty_id)? else {
            return Ok(None);
        };
        let next_height = self.store.tip()?.map_or(0, |t| t.height.saturating_add(1));
        let n = factorn_bignum::decode_lenient(&record.n);
        Ok(Some(BountyView {
            n: factorn_bignum::to_decimal(&n),
            bits: factorn_bignum::bits(&n),
            deadpoolid: record.bounty_id.to_string(),
            bounty: record.bounty().to_string(),
            entries: record.entries.iter().map(EntryView::from).collect(),
            announcements: record
                .announcements
                .iter()
                .map(|a| AnnouncementView::new(a, &self.params, next_height))
                .collect(),
        }))
    }

    pub fn get_view_json(&self, bounty_id: &BountyId) -> Result<serde_json::Value, IndexerError> {
        Ok(serde_json::to_value(self.get_view(bounty_id)?)?)
    }

    /// Summaries of indexed records, ordered by bounty id.
    ///
    /// By default fully-claimed records are left out; `include_historical`
    /// brings them back and counts claimed entries too.
    pub fn list_records(&self, options: &ListOptions) -> Result<Vec<BountySummary>, IndexerError> {
        let records = {
            let _guard = self.barrier.read().unwrap_or_else(PoisonError::into_inner);
            self.store.records()?
        };
        Ok(records
            .iter()
            .filter(|r| {
                options
                    .entries_since_height
                    .map_or(true, |h| r.entries.iter().any(|e| e.height >= h))
            })
            .filter(|r| options.include_announced || r.announcements.is_empty())
            .filter_map(|r| {
                let entries = if options.include_historical {
                    r.entries.len()
                } else {
                    r.unclaimed_entries()
                };
                (entries > 0).then(|| BountySummary {
                    deadpoolid: r.bounty_id.to_string(),
                    bounty: r.bounty().to_string(),
                    entries,
                    announcements: r.announcements.len(),
                })
            })
            .skip(options.offset)
            .take(options.limit)
            .collect())
    }

    pub fn list_records_json(&self, options: &ListOptions) -> Result<serde_json::Value, IndexerError> {
        Ok(serde_json::to_value(self.list_records(options)?)?)
    }

    /// Unclaimed entries of a bounty, ready for a claim transaction.
    pub fn claim_inputs(&self, bounty_id: &BountyId) -> Result<Vec<ClaimInput>, IndexerError> {
        let Some(record) = self.get_record(bounty_id)? else {
            return Ok(Vec::new());
        };
        let script_pubkey = entry_script(&factorn_bignum::decode_lenient(&record.n));
        Ok(record
            .entries
            .iter()
            .filter(|e| !e.is_claimed())
            .map(|e| ClaimInput {
                outpoint: e.outpoint,
                amount: e.amount,
                script_pubkey: script_pubkey.clone(),
            })
            .collect())
    }

    /// Poll until `bounty_id` is indexed or `timeout` passes.
    pub async fn wait_for_record(
        &self,
        bounty_id: &BountyId,
        timeout: Duration,
    ) -> Result<Option<BountyRecord>, IndexerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(record) = self.get_record(bounty_id)? {
                return Ok(Some(record));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}
