//! Staking protocol parameters.
//!
//! Parameters evolve over time as the staking protocol hard-forks; every
//! downstream decision is made against the version active at the *inclusion
//! height* of the transaction being judged, never against "current"
//! parameters.

mod errors;
mod registry;
pub mod serde_helpers;
mod types;

pub use errors::ParamsError;
pub use registry::{load_params, ParamsRegistry};
pub use types::{StakingParams, MAGIC_BYTES_LEN};
