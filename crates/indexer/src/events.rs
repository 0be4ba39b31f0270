//! Lifecycle events pushed to the downstream consumer.
//!
//! Delivery is at-least-once with in-indexer ordering preserved: all events
//! for a block precede any event of the next block, and events within a
//! block follow transaction order. Consumers dedupe if they need
//! exactly-once.

use std::future::Future;

use bitcoin::{Amount, Txid, XOnlyPublicKey};
use stakescan_db::EligibilityStatus;

/// A staking transaction was confirmed and indexed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakingEvent {
    pub staking_tx_hash: Txid,
    pub staker_pk: XOnlyPublicKey,
    pub finality_provider_pk: XOnlyPublicKey,
    pub staking_value: Amount,
    pub staking_time: u16,
    pub inclusion_height: u64,
    pub block_time: u32,
    pub status: EligibilityStatus,
}

/// A stake was spent through its unbonding path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnbondingEvent {
    pub unbonding_tx_hash: Txid,
    pub staking_tx_hash: Txid,
    pub inclusion_height: u64,
    pub block_time: u32,
}

/// A staked output was spent through some path other than unbonding,
/// e.g. the timelock withdrawal path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawEvent {
    pub withdraw_tx_hash: Txid,
    pub staking_tx_hash: Txid,
    pub inclusion_height: u64,
    pub block_time: u32,
}

/// Downstream sink for indexer events.
///
/// Pushes may block; that blocking is the indexer's backpressure signal.
pub trait EventConsumer: Send + Sync + 'static {
    fn start(&self) -> anyhow::Result<()>;

    fn stop(&self) -> anyhow::Result<()>;

    fn push_staking_event(
        &self,
        event: StakingEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn push_unbonding_event(
        &self,
        event: UnbondingEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn push_withdraw_event(
        &self,
        event: WithdrawEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}
