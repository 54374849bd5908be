//! Claim validation for deadpool transactions.
//!
//! Pure functions of a transaction, the coins it spends, the validation
//! height and an announcement snapshot pinned to that height. Nothing here
//! writes to a store, so independent transactions may be checked in parallel.

pub mod error;
pub mod policy;
pub mod validator;

pub use error::{ActivationError, PolicyError, ValidationError};
pub use policy::{check_announcement_policy, check_output_integers};
pub use validator::{ClaimValidator, ClaimedInput, CoinView, PolicyWarning, ValidationReport};
