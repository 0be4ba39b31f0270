//! Shared fixtures for indexer integration tests.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use bitcoin::{
    block::{Header, Version},
    hashes::Hash,
    BlockHash, CompactTarget, Transaction, TxMerkleNode,
};
use stakescan_db_store_sled::SledIndexerStore;
use stakescan_indexer::{
    BtcScanner, EventConsumer, IndexedBlock, StakingEvent, UnbondingEvent, WithdrawEvent,
};
use tokio::sync::mpsc;

/// Everything the indexer pushed, in push order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObservedEvent {
    Staking(StakingEvent),
    Unbonding(UnbondingEvent),
    Withdraw(WithdrawEvent),
}

/// Event consumer that records every push.
#[derive(Clone, Default)]
pub struct RecordingConsumer {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventConsumer for RecordingConsumer {
    fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn push_staking_event(
        &self,
        event: StakingEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        let events = self.events.clone();
        async move {
            events.lock().unwrap().push(ObservedEvent::Staking(event));
            Ok(())
        }
    }

    fn push_unbonding_event(
        &self,
        event: UnbondingEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        let events = self.events.clone();
        async move {
            events.lock().unwrap().push(ObservedEvent::Unbonding(event));
            Ok(())
        }
    }

    fn push_withdraw_event(
        &self,
        event: WithdrawEvent,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        let events = self.events.clone();
        async move {
            events.lock().unwrap().push(ObservedEvent::Withdraw(event));
            Ok(())
        }
    }
}

/// Scanner fed from an in-test channel.
pub struct ChannelScanner {
    rx: mpsc::Receiver<IndexedBlock>,
}

impl ChannelScanner {
    /// Returns the sending half and the scanner around the receiving half.
    pub fn channel(capacity: usize) -> (mpsc::Sender<IndexedBlock>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

impl BtcScanner for ChannelScanner {
    fn start(&mut self, _from_height: u64) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn confirmed_blocks(&mut self) -> &mut mpsc::Receiver<IndexedBlock> {
        &mut self.rx
    }
}

pub fn setup_store() -> Arc<SledIndexerStore> {
    let db = sled::Config::new().temporary(true).open().unwrap();
    Arc::new(SledIndexerStore::new(&db).unwrap())
}

pub fn make_block(height: u64, txs: Vec<Transaction>) -> IndexedBlock {
    let header = Header {
        version: Version::TWO,
        prev_blockhash: BlockHash::all_zeros(),
        merkle_root: TxMerkleNode::all_zeros(),
        time: 1_700_000_000 + height as u32,
        bits: CompactTarget::from_consensus(0x1d00_ffff),
        nonce: 0,
    };
    IndexedBlock::new(height, header, txs)
}
