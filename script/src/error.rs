use factorn_bignum::BignumError;
use factorn_store::StoreError;
use factorn_types::OutPoint;
use thiserror::Error;

/// Why a spending input failed script evaluation.
///
/// Every variant is fatal to the transaction carrying the input and nothing else.
#[derive(Debug, Error)]
pub enum ScriptValidationError {
    #[error("factor does not properly divide N")]
    NonDivisor,

    #[error("claim hash does not commit to this factor and destination")]
    ClaimHashMismatch,

    #[error("no usable announcement for this claim")]
    NoMatchingAnnouncement,

    #[error("integer is not minimally encoded")]
    MalformedInteger,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("announcement check ran before N was established")]
    MissingBountyN,

    #[error("output is unspendable")]
    UnspendableOutput,

    #[error("script evaluated to false")]
    EvalFalse,

    #[error("stack not clean after evaluation ({0} items)")]
    CleanStack(usize),

    #[error("bad or unsupported opcode 0x{0:02x}")]
    BadOpcode(u8),

    #[error("push of {0} bytes exceeds the element size limit")]
    PushSize(usize),

    #[error("stack size limit exceeded")]
    StackSize,

    #[error("unlocking script is not push-only")]
    SigPushOnly,

    #[error("announcement store error: {0}")]
    Store(#[from] StoreError),
}

impl From<BignumError> for ScriptValidationError {
    fn from(_: BignumError) -> Self {
        ScriptValidationError::MalformedInteger
    }
}

/// Errors from the transaction builders.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no entries to claim")]
    NoEntries,

    #[error("output {0} is not a deadpool entry")]
    NotAnEntry(OutPoint),

    #[error("entries reference different N")]
    MixedBounties,

    #[error("solution does not properly divide N")]
    InvalidSolution,

    #[error("fee {fee} exceeds claimable total {total}")]
    InsufficientFunds { total: u64, fee: u64 },

    #[error("invalid integer: {0}")]
    Integer(#[from] BignumError),
}
