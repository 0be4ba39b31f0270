use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DbError {
    /// Insert collided with an already-persisted transaction hash.
    #[error("transaction already persisted")]
    DuplicateTransaction,

    /// A record this operation requires does not exist.
    #[error("transaction not found")]
    TransactionNotFound,

    /// A stored record could not be decoded, or a namespace is missing.
    /// Not recoverable; the process should terminate with the diagnostic.
    #[error("store corrupted: {0}")]
    CorruptedStore(String),

    /// Backing store failure.
    #[error("store backend: {0}")]
    Backend(String),
}

pub type DbResult<T> = Result<T, DbError>;
