use bitcoin::{Amount, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use crate::serde_helpers::{serde_amount_sat, serde_magic_bytes};

/// Length of the protocol tag carried in staking OP_RETURN outputs.
pub const MAGIC_BYTES_LEN: usize = 4;

/// One immutable version of the staking protocol parameters.
///
/// A version applies to every transaction included at
/// `activation_height` or later, until superseded by the next version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Monotonically increasing version number.
    pub version: u16,

    /// First block height at which this version applies.
    pub activation_height: u64,

    /// Protocol tag prefixing the staking OP_RETURN payload.
    #[serde(with = "serde_magic_bytes")]
    pub tag: [u8; MAGIC_BYTES_LEN],

    /// Covenant committee keys participating in the unbonding and slashing
    /// paths.
    pub covenant_pks: Vec<XOnlyPublicKey>,

    /// Number of covenant signatures required on covenant-guarded paths.
    pub covenant_quorum: u32,

    /// Relative timelock (in blocks) on the unbonding output's timelock path.
    pub unbonding_time: u16,

    /// Fee deducted from the staking value by the canonical unbonding
    /// transaction.
    #[serde(with = "serde_amount_sat")]
    pub unbonding_fee: Amount,

    #[serde(with = "serde_amount_sat")]
    pub min_staking_value: Amount,

    #[serde(with = "serde_amount_sat")]
    pub max_staking_value: Amount,

    /// Minimum staking period, in blocks.
    pub min_staking_time: u16,

    /// Maximum staking period, in blocks.
    pub max_staking_time: u16,

    /// Ceiling on cumulative confirmed TVL; stakes admitted past it are
    /// recorded but marked inactive.
    #[serde(with = "serde_amount_sat")]
    pub staking_cap: Amount,
}
