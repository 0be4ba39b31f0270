use thiserror::Error;

/// Errors raised while validating or querying the parameter registry.
///
/// Every variant except [`ParamsError::NotYetActivated`] indicates a
/// misconfigured parameter set and is fatal at startup.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// The queried height precedes the first activation height.
    #[error("no parameter version active at height {0}")]
    NotYetActivated(u64),

    #[error("parameter version list is empty")]
    EmptyRegistry,

    #[error("first activation height must be at least 1")]
    ZeroActivationHeight,

    #[error("activation heights must be strictly ascending (version {version} at height {height})")]
    UnorderedActivationHeights { version: u16, height: u64 },

    #[error("version numbers must be strictly ascending (found {0})")]
    UnorderedVersionNumbers(u16),

    #[error("version {version}: covenant committee is empty")]
    EmptyCovenantCommittee { version: u16 },

    #[error("version {version}: duplicate covenant key")]
    DuplicateCovenantKey { version: u16 },

    #[error("version {version}: quorum {quorum} invalid for committee of {committee}")]
    InvalidCovenantQuorum {
        version: u16,
        quorum: u32,
        committee: usize,
    },

    #[error("version {version}: staking value bounds are invalid")]
    InvalidValueBounds { version: u16 },

    #[error("version {version}: staking time bounds are invalid")]
    InvalidTimeBounds { version: u16 },

    #[error("version {version}: unbonding time must be nonzero")]
    ZeroUnbondingTime { version: u16 },

    #[error("version {version}: unbonding fee must be below the minimum staking value")]
    ExcessiveUnbondingFee { version: u16 },

    #[error("version {version}: staking cap below the maximum staking value")]
    CapBelowMaxStake { version: u16 },

    #[error("failed to read parameters file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode parameters file: {0}")]
    Decode(#[from] serde_json::Error),
}
