use bitcoin::Amount;
use thiserror::Error;

/// Failures while decoding a staking OP_RETURN payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpReturnError {
    #[error("payload is {0} bytes, expected {expected}", expected = crate::op_return::V0_PAYLOAD_LEN)]
    BadLength(usize),

    #[error("unsupported payload version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid staker public key")]
    InvalidStakerKey,

    #[error("invalid finality provider public key")]
    InvalidFinalityProviderKey,
}

/// Failures while constructing the staking or unbonding scripts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakingScriptError {
    #[error("covenant committee is empty")]
    EmptyCovenantCommittee,

    #[error("covenant quorum {quorum} invalid for committee of {committee}")]
    InvalidCovenantQuorum { quorum: u32, committee: usize },

    #[error("could not assemble the taproot script tree")]
    TaprootAssembly,
}

/// A transaction carried a valid protocol tag but is not a well-formed
/// staking transaction.
#[derive(Debug, Error)]
pub enum StakingTxError {
    #[error("tagged payload is malformed: {0}")]
    MalformedPayload(#[from] OpReturnError),

    #[error("no output matches the staking commitment")]
    MissingStakingOutput,

    #[error("multiple outputs match the staking commitment")]
    AmbiguousStakingOutput,

    #[error("staking value {value} outside [{min}, {max}]")]
    ValueOutOfBounds {
        value: Amount,
        min: Amount,
        max: Amount,
    },

    #[error("staking time {time} outside [{min}, {max}]")]
    TimeOutOfBounds { time: u16, min: u16, max: u16 },

    #[error(transparent)]
    Script(#[from] StakingScriptError),
}
