//! Sled-backed implementation of the indexer store.

mod store;

use std::path::Path;

use anyhow::Context;

pub use crate::store::{SledIndexerStore, STAKING_TX_TREE, UNBONDING_TX_TREE};

/// Opens a sled database instance under `datadir`.
pub fn open_sled_database(datadir: &Path, dbname: &str) -> anyhow::Result<sled::Db> {
    let mut database_dir = datadir.to_path_buf();
    database_dir.push("sled");
    database_dir.push(dbname);

    if !database_dir.exists() {
        std::fs::create_dir_all(&database_dir)?;
    }

    sled::open(&database_dir).context("opening sled database")
}
