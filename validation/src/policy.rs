//! Checks on the deadpool outputs a transaction creates.

use factorn_script::DeadpoolScript;
use factorn_types::{ConsensusParams, TxOut};

use crate::PolicyError;

/// Entry and announcement outputs must carry an in-range, canonical N.
///
/// Returns the classified template, or `None` for ordinary outputs.
pub fn check_output_integers(output: &TxOut) -> Result<Option<DeadpoolScript>, PolicyError> {
    let Some(template) = DeadpoolScript::classify(&output.script_pubkey) else {
        return Ok(None);
    };
    factorn_bignum::check_deadpool_integer(template.n())?;
    Ok(Some(template))
}

/// Policy for one announcement output. Non-announcement outputs pass.
pub fn check_announcement_policy(
    output: &TxOut,
    params: &ConsensusParams,
) -> Result<(), PolicyError> {
    match check_output_integers(output)? {
        Some(DeadpoolScript::Announce { .. }) if output.value < params.min_announce_burn => {
            Err(PolicyError::BelowMinimumBurn {
                burn: output.value,
                min: params.min_announce_burn,
            })
        }
        _ => Ok(()),
    }
}
