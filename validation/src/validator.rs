//! Transaction-level claim validation.

use std::collections::{BTreeMap, HashMap};

use factorn_bignum::BigUint;
use factorn_script::{uses_deadpool_opcodes, verify_input, DeadpoolScript, ExecContext};
use factorn_store::{AnnouncementRecord, AnnouncementSnapshot};
use factorn_types::{Amount, BountyId, ConsensusParams, OutPoint, Transaction, TxOut};
use rayon::prelude::*;

use crate::policy::{check_announcement_policy, check_output_integers};
use crate::{ActivationError, PolicyError, ValidationError};

/// The host's view of spendable outputs.
pub trait CoinView {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut>;
}

impl CoinView for HashMap<OutPoint, TxOut> {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.get(outpoint).cloned()
    }
}

impl CoinView for BTreeMap<OutPoint, TxOut> {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.get(outpoint).cloned()
    }
}

/// An input that spent a deadpool entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimedInput {
    pub index: usize,
    pub bounty_id: BountyId,
    pub factor: BigUint,
    pub amount: Amount,
    pub announcement: AnnouncementRecord,
}

/// A non-fatal policy finding on one output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyWarning {
    pub output: usize,
    pub error: PolicyError,
}

/// Result of a successful validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub claims: Vec<ClaimedInput>,
    pub warnings: Vec<PolicyWarning>,
}

impl ValidationReport {
    pub fn is_claim(&self) -> bool {
        !self.claims.is_empty()
    }
}

/// Validates transactions against the deadpool rules.
///
/// Only inputs that touch deadpool opcodes are evaluated; every other input
/// is left to the host's own script checks.
#[derive(Clone, Debug)]
pub struct ClaimValidator {
    params: ConsensusParams,
}

impl ClaimValidator {
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Validate `tx` for inclusion at `height`.
    ///
    /// The claim destination is the locking script of output 0.
    pub fn validate(
        &self,
        tx: &Transaction,
        coins: &impl CoinView,
        height: u32,
        snapshot: &dyn AnnouncementSnapshot,
    ) -> Result<ValidationReport, ValidationError> {
        let result = self.validate_inner(tx, coins, height, snapshot);
        if let Err(e) = &result {
            tracing::debug!(txid = %tx.txid(), height, error = %e, "deadpool transaction rejected");
        }
        result
    }

    /// Validate independent transactions in parallel against one snapshot.
    ///
    /// Results are returned in input order. Transactions must not spend each
    /// other's outputs; `coins` is not updated between them.
    pub fn validate_many<C>(
        &self,
        txs: &[Transaction],
        coins: &C,
        height: u32,
        snapshot: &(dyn AnnouncementSnapshot + Sync),
    ) -> Vec<Result<ValidationReport, ValidationError>>
    where
        C: CoinView + Sync,
    {
        txs.par_iter()
            .map(|tx| self.validate(tx, coins, height, snapshot))
            .collect()
    }

    fn validate_inner(
        &self,
        tx: &Transaction,
        coins: &impl CoinView,
        height: u32,
        snapshot: &dyn AnnouncementSnapshot,
    ) -> Result<ValidationReport, ValidationError> {
        if snapshot.height() != height {
            return Err(ValidationError::SnapshotHeight {
                snapshot: snapshot.height(),
                height,
            });
        }
        let active = self.params.is_active(height);
        let not_active = || ActivationError::FeatureNotActive {
            height,
            activation_height: self.params.activation_height,
        };

        let mut report = ValidationReport::default();

        for (index, output) in tx.outputs.iter().enumerate() {
            if !active && uses_deadpool_opcodes(&output.script_pubkey) {
                return Err(not_active().into());
            }
            check_output_integers(output)
                .map_err(|source| ValidationError::Policy { index, source })?;
            if let Err(error) = check_announcement_policy(output, &self.params) {
                tracing::debug!(output = index, %error, "announcement policy warning");
                report.warnings.push(PolicyWarning { output: index, error });
            }
        }

        let destination = tx
            .outputs
            .first()
            .map(|o| o.script_pubkey.as_bytes())
            .unwrap_or_default();
        let ctx = ExecContext {
            destination,
            snapshot,
        };

        for (index, input) in tx.inputs.iter().enumerate() {
            let coin = coins
                .coin(&input.prevout)
                .ok_or(ValidationError::MissingCoin {
                    index,
                    outpoint: input.prevout,
                })?;
            let spent = &coin.script_pubkey;
            if !uses_deadpool_opcodes(spent) && !uses_deadpool_opcodes(&input.script_sig) {
                continue;
            }
            if !active {
                return Err(not_active().into());
            }

            let outcome = verify_input(&input.script_sig, spent, &ctx)
                .map_err(|source| ValidationError::Script { index, source })?;

            let is_entry = DeadpoolScript::classify(spent).is_some_and(|s| s.is_entry());
            if let (true, Some(n), Some(factor), Some(announcement)) = (
                is_entry,
                outcome.bounty_n,
                outcome.factor,
                outcome.announcement,
            ) {
                report.claims.push(ClaimedInput {
                    index,
                    bounty_id: factorn_crypto::bounty_id(&n),
                    factor,
                    amount: coin.value,
                    announcement,
                });
            }
        }

        Ok(report)
    }
}
