//! The staking indexing state machine.
//!
//! Consumes a stream of confirmed Bitcoin blocks, recognizes staking and
//! unbonding transactions under the parameter version active at each block
//! height, persists them, keeps cap/TVL accounting, and pushes lifecycle
//! events to a downstream consumer.

mod block;
mod errors;
mod events;
mod indexer;
mod scanner;
pub mod tvl;
pub mod unbonding;

pub use block::IndexedBlock;
pub use errors::IndexerError;
pub use events::{EventConsumer, StakingEvent, UnbondingEvent, WithdrawEvent};
pub use indexer::{IndexerHandle, IndexerStatus, StakingIndexer};
pub use scanner::BtcScanner;
pub use tvl::TvlTracker;
pub use unbonding::{verify_unbonding_tx, UnbondingCheck, UnbondingTxError};
