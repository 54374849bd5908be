//! Fundamental types for the FactorN deadpool.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! 256-bit hashes (transaction ids, block hashes, bounty ids, claim hashes),
//! amounts, the minimal UTXO transaction/block model the deadpool operates on,
//! network identifiers, and the deadpool consensus parameters.

pub mod amount;
pub mod block;
pub mod bounty;
pub mod error;
pub mod hash;
pub mod network;
pub mod params;
pub mod transaction;

pub use amount::{Amount, COIN};
pub use block::{Block, BlockHash};
pub use bounty::{BountyId, ClaimHash};
pub use error::TypeError;
pub use hash::TxId;
pub use network::NetworkId;
pub use params::{
    AnnouncementState, ConsensusParams, DEFAULT_MIN_ANNOUNCE_BURN, MAX_SCRIPT_ELEMENT_SIZE,
    MIN_DEADPOOL_INTEGER_BITS,
};
pub use transaction::{OutPoint, Script, Transaction, TxIn, TxOut};
