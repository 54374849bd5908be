use factorn_bignum::BignumError;
use factorn_script::ScriptValidationError;
use factorn_types::{Amount, OutPoint};
use thiserror::Error;

/// Why a transaction was rejected.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("input {index}: {source}")]
    Script {
        index: usize,
        source: ScriptValidationError,
    },

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("output {index}: {source}")]
    Policy { index: usize, source: PolicyError },

    #[error("input {index} spends unknown output {outpoint}")]
    MissingCoin { index: usize, outpoint: OutPoint },

    #[error("snapshot is pinned at height {snapshot}, validating at {height}")]
    SnapshotHeight { snapshot: u32, height: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("deadpool opcodes are not active at height {height} (activation at {activation_height})")]
    FeatureNotActive { height: u32, activation_height: u32 },
}

/// Output-level policy failures.
///
/// `InvalidInteger` rejects the transaction; `BelowMinimumBurn` is only
/// reported, the output can still be mined but will never become usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("announcement burns {burn}, minimum is {min}")]
    BelowMinimumBurn { burn: Amount, min: Amount },

    #[error("invalid deadpool integer: {0}")]
    InvalidInteger(#[from] BignumError),
}
