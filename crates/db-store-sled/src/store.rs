use bitcoin::{hashes::Hash, Txid};
use sled::{
    transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError},
    Transactional, Tree,
};
use stakescan_db::{
    DbError, DbResult, IndexerDatabase, StakingTxRecord, StoredStakingTx, StoredUnbondingTx,
    UnbondingTxRecord,
};

/// Tree holding staking records, keyed by staking tx hash.
pub const STAKING_TX_TREE: &str = "staking_txs";

/// Tree holding unbonding records, keyed by unbonding tx hash.
pub const UNBONDING_TX_TREE: &str = "unbonding_txs";

/// Indexer store over two sled trees.
///
/// Keys are raw 32-byte transaction hashes; values are borsh-encoded wire
/// records. Each write is a single sled operation (or one cross-tree
/// transaction for the unbonding existence check) followed by a flush.
#[derive(Debug)]
pub struct SledIndexerStore {
    staking_tree: Tree,
    unbonding_tree: Tree,
}

impl SledIndexerStore {
    pub fn new(db: &sled::Db) -> DbResult<Self> {
        Ok(Self {
            staking_tree: db.open_tree(STAKING_TX_TREE).map_err(to_db_error)?,
            unbonding_tree: db.open_tree(UNBONDING_TX_TREE).map_err(to_db_error)?,
        })
    }

    fn flush(&self) -> DbResult<()> {
        self.staking_tree.flush().map_err(to_db_error)?;
        self.unbonding_tree.flush().map_err(to_db_error)?;
        Ok(())
    }
}

impl IndexerDatabase for SledIndexerStore {
    fn add_staking_tx(&self, tx: &StoredStakingTx) -> DbResult<()> {
        let key = tx.txid().to_byte_array();
        let value = encode_record(&StakingTxRecord::from(tx))?;

        let swap = self
            .staking_tree
            .compare_and_swap(&key[..], Option::<&[u8]>::None, Some(value))
            .map_err(to_db_error)?;
        if swap.is_err() {
            return Err(DbError::DuplicateTransaction);
        }

        self.flush()
    }

    fn get_staking_tx(&self, txid: &Txid) -> DbResult<Option<StoredStakingTx>> {
        let key = txid.to_byte_array();
        let Some(bytes) = self.staking_tree.get(&key[..]).map_err(to_db_error)? else {
            return Ok(None);
        };
        let record: StakingTxRecord = decode_record(&bytes)?;
        Ok(Some(StoredStakingTx::try_from(record)?))
    }

    fn add_unbonding_tx(&self, tx: &StoredUnbondingTx) -> DbResult<()> {
        let key = tx.txid().to_byte_array();
        let staking_key = tx.staking_tx_hash.to_byte_array();
        let value = encode_record(&UnbondingTxRecord::from(tx))?;

        // The referenced staking tx must exist within the same transaction
        // that inserts the unbonding record.
        let result: Result<(), TransactionError<DbError>> = (&self.staking_tree, &self.unbonding_tree)
            .transaction(
                |(staking, unbonding)| -> ConflictableTransactionResult<(), DbError> {
                    if staking.get(&staking_key[..])?.is_none() {
                        return Err(ConflictableTransactionError::Abort(
                            DbError::TransactionNotFound,
                        ));
                    }
                    if unbonding.get(&key[..])?.is_some() {
                        return Err(ConflictableTransactionError::Abort(
                            DbError::DuplicateTransaction,
                        ));
                    }
                    unbonding.insert(&key[..], value.clone())?;
                    Ok(())
                },
            );

        match result {
            Ok(()) => self.flush(),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(to_db_error(e)),
        }
    }

    fn get_unbonding_tx(&self, txid: &Txid) -> DbResult<Option<StoredUnbondingTx>> {
        let key = txid.to_byte_array();
        let Some(bytes) = self.unbonding_tree.get(&key[..]).map_err(to_db_error)? else {
            return Ok(None);
        };
        let record: UnbondingTxRecord = decode_record(&bytes)?;
        Ok(Some(StoredUnbondingTx::try_from(record)?))
    }

    fn staking_tx_entries(&self) -> DbResult<Vec<StoredStakingTx>> {
        let mut entries = Vec::new();
        for item in self.staking_tree.iter() {
            let (_, bytes) = item.map_err(to_db_error)?;
            let record: StakingTxRecord = decode_record(&bytes)?;
            entries.push(StoredStakingTx::try_from(record)?);
        }
        Ok(entries)
    }

    fn unbonding_tx_entries(&self) -> DbResult<Vec<StoredUnbondingTx>> {
        let mut entries = Vec::new();
        for item in self.unbonding_tree.iter() {
            let (_, bytes) = item.map_err(to_db_error)?;
            let record: UnbondingTxRecord = decode_record(&bytes)?;
            entries.push(StoredUnbondingTx::try_from(record)?);
        }
        Ok(entries)
    }
}

fn encode_record<T: borsh::BorshSerialize>(record: &T) -> DbResult<Vec<u8>> {
    borsh::to_vec(record).map_err(|e| DbError::Backend(e.to_string()))
}

fn decode_record<T: borsh::BorshDeserialize>(bytes: &[u8]) -> DbResult<T> {
    borsh::from_slice(bytes).map_err(|e| DbError::CorruptedStore(e.to_string()))
}

fn to_db_error<E: std::fmt::Display>(e: E) -> DbError {
    DbError::Backend(e.to_string())
}
