//! Classification of transactions that spend a stored staking transaction.

use bitcoin::{Amount, Transaction};
use stakescan_db::StoredStakingTx;
use stakescan_params::StakingParams;
use stakescan_stakingtx::{scripts::unbonding_script_pubkey, StakingScriptError};
use thiserror::Error;

/// An attempted unbonding that violates the protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnbondingTxError {
    #[error("expected exactly 1 input, found {0}")]
    WrongInputCount(usize),

    #[error("expected exactly 1 output, found {0}")]
    WrongOutputCount(usize),

    #[error("output script does not match the canonical unbonding script")]
    OutputScriptMismatch,

    #[error("output value {actual} does not match expected {expected}")]
    OutputValueMismatch { expected: Amount, actual: Amount },

    #[error("unbonding fee exceeds the staking value")]
    FeeExceedsStakingValue,

    #[error(transparent)]
    Script(#[from] StakingScriptError),
}

/// Three-way outcome of unbonding validation.
///
/// Distinguishing "not an unbonding attempt" from "attempted but malformed"
/// lets the state machine keep processing the block while still surfacing
/// protocol-violation evidence.
#[derive(Debug, PartialEq, Eq)]
pub enum UnbondingCheck {
    /// The unique valid unbonding spend of the stake.
    Valid,
    /// Some other spend; possibly a timelock withdrawal, possibly unrelated.
    NotUnbonding,
    /// Spends the staking output through the unbonding path shape but
    /// violates the protocol.
    Invalid(UnbondingTxError),
}

/// Decides whether `tx` is the valid unbonding spend of `staking_tx` under
/// the parameter version active at the stake's inclusion height.
pub fn verify_unbonding_tx(
    tx: &Transaction,
    staking_tx: &StoredStakingTx,
    params: &StakingParams,
) -> UnbondingCheck {
    // A canonical unbonding tx is a 1-in 1-out transfer of the staking
    // output. Anything with a different input shape is a malformed attempt,
    // not an unrelated spend.
    if tx.input.len() != 1 {
        return UnbondingCheck::Invalid(UnbondingTxError::WrongInputCount(tx.input.len()));
    }

    let outpoint = tx.input[0].previous_output;
    if outpoint.txid != staking_tx.txid() || outpoint.vout != staking_tx.staking_output_idx {
        return UnbondingCheck::NotUnbonding;
    }

    if tx.output.len() != 1 {
        return UnbondingCheck::Invalid(UnbondingTxError::WrongOutputCount(tx.output.len()));
    }

    let expected_spk = match unbonding_script_pubkey(
        &staking_tx.staker_pk,
        &staking_tx.finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        params.unbonding_time,
    ) {
        Ok(spk) => spk,
        Err(e) => return UnbondingCheck::Invalid(e.into()),
    };
    if tx.output[0].script_pubkey != expected_spk {
        return UnbondingCheck::Invalid(UnbondingTxError::OutputScriptMismatch);
    }

    let Some(expected_value) = staking_tx.staking_value.checked_sub(params.unbonding_fee) else {
        return UnbondingCheck::Invalid(UnbondingTxError::FeeExceedsStakingValue);
    };
    if tx.output[0].value != expected_value {
        return UnbondingCheck::Invalid(UnbondingTxError::OutputValueMismatch {
            expected: expected_value,
            actual: tx.output[0].value,
        });
    }

    UnbondingCheck::Valid
}
