//! Low level database interface for indexed staking data.

use bitcoin::Txid;

use crate::{
    errors::DbResult,
    types::{StoredStakingTx, StoredUnbondingTx},
};

/// Durable K→V persistence for staking and unbonding records, keyed by
/// transaction hash. Operations are NOT validated at this level beyond the
/// structural guarantees documented per method; protocol validation happens
/// in the indexer.
pub trait IndexerDatabase: Send + Sync + 'static {
    /// Persists a staking record. Fails with
    /// [`DbError::DuplicateTransaction`](crate::DbError::DuplicateTransaction)
    /// if the hash is already present.
    fn add_staking_tx(&self, tx: &StoredStakingTx) -> DbResult<()>;

    /// Point lookup of a staking record by transaction hash.
    fn get_staking_tx(&self, txid: &Txid) -> DbResult<Option<StoredStakingTx>>;

    /// Persists an unbonding record. The referenced staking transaction must
    /// already exist, checked atomically with the insert, otherwise fails
    /// with [`DbError::TransactionNotFound`](crate::DbError::TransactionNotFound).
    /// Fails with `DuplicateTransaction` on an unbonding-hash collision.
    fn add_unbonding_tx(&self, tx: &StoredUnbondingTx) -> DbResult<()>;

    /// Point lookup of an unbonding record by transaction hash.
    fn get_unbonding_tx(&self, txid: &Txid) -> DbResult<Option<StoredUnbondingTx>>;

    /// Every stored staking record, in unspecified order. Used by the
    /// startup TVL replay.
    fn staking_tx_entries(&self) -> DbResult<Vec<StoredStakingTx>>;

    /// Every stored unbonding record, in unspecified order.
    fn unbonding_tx_entries(&self) -> DbResult<Vec<StoredUnbondingTx>>;
}
