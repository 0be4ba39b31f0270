//! The indexing state machine and its run-loop task.

use std::sync::Arc;

use bitcoin::{Amount, Transaction, Txid};
use serde::Serialize;
use stakescan_db::{DbError, DbResult, IndexerDatabase, StoredStakingTx, StoredUnbondingTx};
use stakescan_params::{ParamsError, ParamsRegistry, StakingParams};
use stakescan_stakingtx::{parse_staking_tx, ParsedStakingTx};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    block::IndexedBlock,
    errors::IndexerError,
    events::{EventConsumer, StakingEvent, UnbondingEvent, WithdrawEvent},
    scanner::BtcScanner,
    tvl::TvlTracker,
    unbonding::{verify_unbonding_tx, UnbondingCheck},
};

/// Lifecycle state of the indexer, published on a watch channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum IndexerStatus {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// The indexing state machine.
///
/// All state mutation (store writes, TVL updates, event pushes) happens
/// from a single task, which makes the per-block ordering guarantees hold
/// without locks. Construction performs the read-only recovery pass that
/// rebuilds TVL from the stored record set.
pub struct StakingIndexer<D, C, S> {
    registry: Arc<ParamsRegistry>,
    store: Arc<D>,
    consumer: C,
    scanner: S,
    tvl: TvlTracker,
}

impl<D, C, S> StakingIndexer<D, C, S>
where
    D: IndexerDatabase,
    C: EventConsumer,
    S: BtcScanner,
{
    pub fn new(
        registry: Arc<ParamsRegistry>,
        store: Arc<D>,
        consumer: C,
        scanner: S,
    ) -> Result<Self, IndexerError> {
        let tvl = TvlTracker::rebuild(store.as_ref(), &registry)?;
        info!(
            versions = registry.versions().count(),
            confirmed_tvl = %tvl.total(),
            "indexer state recovered"
        );
        Ok(Self {
            registry,
            store,
            consumer,
            scanner,
            tvl,
        })
    }

    /// Total confirmed TVL across all parameter versions.
    pub fn confirmed_tvl(&self) -> Amount {
        self.tvl.total()
    }

    /// Confirmed TVL accumulated under one parameter version.
    pub fn confirmed_tvl_for_version(&self, version: u16) -> Amount {
        self.tvl.version_tvl(version)
    }

    pub fn get_staking_tx(&self, txid: &Txid) -> DbResult<Option<StoredStakingTx>> {
        self.store.get_staking_tx(txid)
    }

    pub fn get_unbonding_tx(&self, txid: &Txid) -> DbResult<Option<StoredUnbondingTx>> {
        self.store.get_unbonding_tx(txid)
    }

    /// Starts the consumer, the scanner, and the single consumer task.
    pub fn start(mut self, from_height: u64) -> Result<IndexerHandle, IndexerError> {
        self.consumer.start().map_err(IndexerError::Consumer)?;
        self.scanner.start(from_height).map_err(IndexerError::Scanner)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(IndexerStatus::Running);
        let task = tokio::spawn(self.run(shutdown_rx, status_tx));

        info!(%from_height, "staking indexer started");
        Ok(IndexerHandle {
            shutdown_tx,
            status_rx,
            task,
        })
    }

    async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        status_tx: watch::Sender<IndexerStatus>,
    ) -> Result<(), IndexerError> {
        let result = loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("shutdown signal observed");
                        break Ok(());
                    }
                }
                maybe_block = self.scanner.confirmed_blocks().recv() => {
                    match maybe_block {
                        Some(block) => {
                            if let Err(e) = self.process_block(&block).await {
                                error!(height = %block.height, %e, "failed to process confirmed block");
                                break Err(e);
                            }
                        }
                        None => {
                            warn!("confirmed block channel closed, stopping");
                            break Ok(());
                        }
                    }
                }
            }
        };

        let _ = status_tx.send(IndexerStatus::Stopping);
        if let Err(e) = self.consumer.stop() {
            warn!(%e, "event consumer did not stop cleanly");
        }
        if let Err(e) = self.scanner.stop() {
            warn!(%e, "scanner did not stop cleanly");
        }
        let _ = status_tx.send(IndexerStatus::Stopped);
        info!("staking indexer stopped");

        result
    }

    /// Processes one confirmed block: staking recognition first, then spend
    /// classification, in transaction order.
    pub async fn process_block(&mut self, block: &IndexedBlock) -> Result<(), IndexerError> {
        let height = block.height;
        let registry = self.registry.clone();
        let params = match registry.get_params_for_height(height) {
            Ok(params) => params,
            Err(ParamsError::NotYetActivated(_)) => {
                debug!(%height, "no parameter version active yet, skipping block");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        debug!(%height, txs = block.txs.len(), "processing confirmed block");
        for tx in &block.txs {
            match parse_staking_tx(tx, params) {
                Ok(Some(parsed)) => {
                    self.process_staking_tx(tx, &parsed, height, block.block_time())
                        .await?;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(txid = %tx.compute_txid(), %height, %e, "invalid staking transaction");
                    continue;
                }
            }

            self.process_stake_spends(tx, height, block.block_time())
                .await?;
        }

        Ok(())
    }

    /// Classifies any inputs of `tx` that spend a known staking transaction.
    async fn process_stake_spends(
        &mut self,
        tx: &Transaction,
        height: u64,
        block_time: u32,
    ) -> Result<(), IndexerError> {
        let registry = self.registry.clone();
        for txin in &tx.input {
            let staking_tx_hash = txin.previous_output.txid;
            let Some(staking_tx) = self.store.get_staking_tx(&staking_tx_hash)? else {
                continue;
            };

            // Judged under the version active when the stake was included,
            // never the version active now.
            let params = registry.get_params_for_height(staking_tx.inclusion_height)?;

            match verify_unbonding_tx(tx, &staking_tx, params) {
                UnbondingCheck::Valid => {
                    self.process_unbonding_tx(tx, &staking_tx_hash, height, block_time, params)
                        .await?;
                }
                UnbondingCheck::NotUnbonding => {
                    let event = WithdrawEvent {
                        withdraw_tx_hash: tx.compute_txid(),
                        staking_tx_hash,
                        inclusion_height: height,
                        block_time,
                    };
                    info!(
                        txid = %event.withdraw_tx_hash,
                        staking_txid = %staking_tx_hash,
                        %height,
                        "found withdrawal from staking transaction"
                    );
                    self.consumer
                        .push_withdraw_event(event)
                        .await
                        .map_err(IndexerError::Consumer)?;
                }
                UnbondingCheck::Invalid(e) => {
                    warn!(
                        txid = %tx.compute_txid(),
                        staking_txid = %staking_tx_hash,
                        %height,
                        %e,
                        "invalid unbonding transaction"
                    );
                }
            }
        }
        Ok(())
    }

    /// Persists a parsed staking transaction, assigns its eligibility, and
    /// emits the staking event. Already-indexed hashes are a no-op.
    pub async fn process_staking_tx(
        &mut self,
        tx: &Transaction,
        parsed: &ParsedStakingTx,
        height: u64,
        block_time: u32,
    ) -> Result<(), IndexerError> {
        let txid = tx.compute_txid();
        if self.store.get_staking_tx(&txid)?.is_some() {
            debug!(%txid, "staking tx already indexed, skipping");
            return Ok(());
        }

        let registry = self.registry.clone();
        let params = registry.get_params_for_height(height)?;
        let staking_value = parsed.staking_output.value;
        let status = self.tvl.admit(params, staking_value);

        let stored = StoredStakingTx {
            tx: tx.clone(),
            staking_output_idx: parsed.staking_output_idx,
            inclusion_height: height,
            staker_pk: parsed.op_return_data.staker_pk,
            staking_time: parsed.op_return_data.staking_time,
            finality_provider_pk: parsed.op_return_data.finality_provider_pk,
            staking_value,
            status,
        };
        match self.store.add_staking_tx(&stored) {
            Ok(()) => {}
            // Idempotent replay; the existence check above makes this
            // unreachable from a single consumer task.
            Err(DbError::DuplicateTransaction) => {
                debug!(%txid, "staking tx raced an earlier insert, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        info!(%txid, %height, value = %staking_value, %status, "indexed staking transaction");

        let event = StakingEvent {
            staking_tx_hash: txid,
            staker_pk: parsed.op_return_data.staker_pk,
            finality_provider_pk: parsed.op_return_data.finality_provider_pk,
            staking_value,
            staking_time: parsed.op_return_data.staking_time,
            inclusion_height: height,
            block_time,
            status,
        };
        self.consumer
            .push_staking_event(event)
            .await
            .map_err(IndexerError::Consumer)
    }

    /// Persists a validated unbonding transaction, returns the unbonded
    /// value to the cap, and emits the unbonding event. Already-indexed
    /// hashes are a no-op.
    pub async fn process_unbonding_tx(
        &mut self,
        tx: &Transaction,
        staking_tx_hash: &Txid,
        height: u64,
        block_time: u32,
        params: &StakingParams,
    ) -> Result<(), IndexerError> {
        let txid = tx.compute_txid();
        if self.store.get_unbonding_tx(&txid)?.is_some() {
            debug!(%txid, "unbonding tx already indexed, skipping");
            return Ok(());
        }

        let staking_tx = self
            .store
            .get_staking_tx(staking_tx_hash)?
            .ok_or(DbError::TransactionNotFound)?;

        let stored = StoredUnbondingTx {
            tx: tx.clone(),
            staking_tx_hash: *staking_tx_hash,
        };
        match self.store.add_unbonding_tx(&stored) {
            Ok(()) => {}
            Err(DbError::DuplicateTransaction) => {
                debug!(%txid, "unbonding tx raced an earlier insert, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if !staking_tx.is_overflow() {
            self.tvl.release(params.version, staking_tx.staking_value);
        }

        info!(%txid, staking_txid = %staking_tx_hash, %height, "indexed unbonding transaction");

        let event = UnbondingEvent {
            unbonding_tx_hash: txid,
            staking_tx_hash: *staking_tx_hash,
            inclusion_height: height,
            block_time,
        };
        self.consumer
            .push_unbonding_event(event)
            .await
            .map_err(IndexerError::Consumer)
    }
}

/// Handle to a started indexer task.
#[derive(Debug)]
pub struct IndexerHandle {
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<IndexerStatus>,
    task: JoinHandle<Result<(), IndexerError>>,
}

impl IndexerHandle {
    /// Most recently published lifecycle status.
    pub fn status(&self) -> IndexerStatus {
        *self.status_rx.borrow()
    }

    /// Signals shutdown without waiting. Idempotent; the run loop observes
    /// the signal between blocks, so the block in flight completes.
    pub fn signal_stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Signals shutdown and waits for the run loop to drain and exit.
    pub async fn stop(self) -> Result<(), IndexerError> {
        self.signal_stop();
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(IndexerError::Task(e.to_string())),
        }
    }

    /// Waits for the run loop to exit on its own (e.g. scanner shutdown).
    pub async fn join(self) -> Result<(), IndexerError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(IndexerError::Task(e.to_string())),
        }
    }
}
