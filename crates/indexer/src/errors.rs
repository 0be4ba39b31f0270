use stakescan_db::DbError;
use stakescan_params::ParamsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("event consumer: {0}")]
    Consumer(#[source] anyhow::Error),

    #[error("scanner: {0}")]
    Scanner(#[source] anyhow::Error),

    #[error("indexer task: {0}")]
    Task(String),
}
