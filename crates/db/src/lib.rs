//! Trait definitions and record types for the indexer's durable store.

mod errors;
mod traits;
mod types;

pub use errors::{DbError, DbResult};
pub use traits::IndexerDatabase;
pub use types::{
    EligibilityStatus, StakingTxRecord, StoredStakingTx, StoredUnbondingTx, UnbondingTxRecord,
};
