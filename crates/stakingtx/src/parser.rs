//! Recognition of staking transactions under a parameter version.

use bitcoin::{Transaction, TxOut};
use stakescan_params::StakingParams;

use crate::{
    errors::{OpReturnError, StakingTxError},
    op_return::{extract_op_return_payload, OpReturnData, SUPPORTED_VERSION},
    scripts::staking_script_pubkey,
};

/// A transaction recognized as a staking transaction, with the two outputs
/// that make it one.
#[derive(Clone, Debug)]
pub struct ParsedStakingTx {
    pub staking_output: TxOut,
    pub staking_output_idx: u32,
    pub op_return_output: TxOut,
    pub op_return_output_idx: u32,
    pub op_return_data: OpReturnData,
}

/// Attempts to parse `tx` as a staking transaction under `params`.
///
/// Returns `Ok(None)` when the transaction simply is not a staking
/// transaction (no unique tagged OP_RETURN, or an undecodable-by-shape
/// payload). Returns an error when the tag matched (a valid tag constitutes
/// intent) but the rest of the transaction violates the protocol.
pub fn parse_staking_tx(
    tx: &Transaction,
    params: &StakingParams,
) -> Result<Option<ParsedStakingTx>, StakingTxError> {
    // Exactly one OP_RETURN output carrying the protocol tag.
    let mut tagged: Option<(u32, &TxOut, &[u8])> = None;
    for (idx, out) in tx.output.iter().enumerate() {
        let Some(payload) = extract_op_return_payload(&out.script_pubkey) else {
            continue;
        };
        if !payload.starts_with(&params.tag) {
            continue;
        }
        if tagged.is_some() {
            return Ok(None);
        }
        tagged = Some((idx as u32, out, payload));
    }
    let Some((op_return_output_idx, op_return_output, payload)) = tagged else {
        return Ok(None);
    };

    let op_return_data = match OpReturnData::decode(payload) {
        Ok(data) => data,
        // Wrong length or a foreign version: some other protocol sharing the
        // tag prefix, not a malformed stake.
        Err(OpReturnError::BadLength(_)) | Err(OpReturnError::UnsupportedVersion(_)) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };
    debug_assert_eq!(op_return_data.version, SUPPORTED_VERSION);

    // The advertised staking output commitment, recomputed from the payload
    // and the covenant committee of the active parameters.
    let expected_spk = staking_script_pubkey(
        &op_return_data.staker_pk,
        &op_return_data.finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        op_return_data.staking_time,
    )?;

    let mut staking: Option<(u32, &TxOut)> = None;
    for (idx, out) in tx.output.iter().enumerate() {
        if out.script_pubkey != expected_spk {
            continue;
        }
        if staking.is_some() {
            return Err(StakingTxError::AmbiguousStakingOutput);
        }
        staking = Some((idx as u32, out));
    }
    let (staking_output_idx, staking_output) =
        staking.ok_or(StakingTxError::MissingStakingOutput)?;

    if staking_output.value < params.min_staking_value
        || staking_output.value > params.max_staking_value
    {
        return Err(StakingTxError::ValueOutOfBounds {
            value: staking_output.value,
            min: params.min_staking_value,
            max: params.max_staking_value,
        });
    }
    if op_return_data.staking_time < params.min_staking_time
        || op_return_data.staking_time > params.max_staking_time
    {
        return Err(StakingTxError::TimeOutOfBounds {
            time: op_return_data.staking_time,
            min: params.min_staking_time,
            max: params.max_staking_time,
        });
    }

    Ok(Some(ParsedStakingTx {
        staking_output: staking_output.clone(),
        staking_output_idx,
        op_return_output: op_return_output.clone(),
        op_return_output_idx,
        op_return_data,
    }))
}
