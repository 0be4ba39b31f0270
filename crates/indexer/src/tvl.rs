//! Per-version confirmed TVL accounting and stake eligibility.
//!
//! TVL is a process-lifetime accumulator, never persisted as a scalar: on
//! startup it is rebuilt from the stored record set so the two can not
//! drift. Admission compares a candidate against the cap of the version it
//! is included under, minus the TVL accumulated across *all* versions:
//! the cap is a global ceiling that can grow from version to version.

use std::collections::BTreeMap;

use bitcoin::Amount;
use stakescan_db::{DbError, EligibilityStatus, IndexerDatabase};
use stakescan_params::{ParamsRegistry, StakingParams};
use tracing::debug;

use crate::errors::IndexerError;

/// Running confirmed-TVL accumulators, one per parameter version.
#[derive(Clone, Debug, Default)]
pub struct TvlTracker {
    confirmed: BTreeMap<u16, Amount>,
}

impl TvlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total confirmed TVL across every parameter version.
    pub fn total(&self) -> Amount {
        self.confirmed
            .values()
            .fold(Amount::ZERO, |acc, v| acc + *v)
    }

    /// Confirmed TVL accumulated under one version.
    pub fn version_tvl(&self, version: u16) -> Amount {
        self.confirmed
            .get(&version)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Decides eligibility of a stake of `value` included under `params`,
    /// accumulating it when admitted. Overflow stakes are not accumulated.
    pub fn admit(&mut self, params: &StakingParams, value: Amount) -> EligibilityStatus {
        let remaining = params
            .staking_cap
            .checked_sub(self.total())
            .unwrap_or(Amount::ZERO);
        if value > remaining {
            return EligibilityStatus::Inactive;
        }
        *self
            .confirmed
            .entry(params.version)
            .or_insert(Amount::ZERO) += value;
        EligibilityStatus::Active
    }

    /// Returns the value of an unbonded active stake to the version it was
    /// accumulated under.
    pub fn release(&mut self, version: u16, value: Amount) {
        let entry = self.confirmed.entry(version).or_insert(Amount::ZERO);
        // An active stake was accumulated on admission, so this cannot
        // underflow; saturate rather than poison the accounting.
        *entry = entry.checked_sub(value).unwrap_or(Amount::ZERO);
    }

    /// Rebuilds the accumulators from the stored record set.
    ///
    /// Staking records are replayed in `(inclusion_height, txid)` order
    /// using their persisted eligibility flags; stored unbonding records are
    /// then applied. Deterministic for a given store content.
    pub fn rebuild<D: IndexerDatabase>(
        store: &D,
        registry: &ParamsRegistry,
    ) -> Result<Self, IndexerError> {
        let mut tracker = Self::new();

        let mut staking = store.staking_tx_entries()?;
        staking.sort_by_key(|entry| (entry.inclusion_height, entry.txid()));
        for entry in &staking {
            if entry.is_overflow() {
                continue;
            }
            let params = registry.get_params_for_height(entry.inclusion_height)?;
            *tracker
                .confirmed
                .entry(params.version)
                .or_insert(Amount::ZERO) += entry.staking_value;
        }

        for unbonding in store.unbonding_tx_entries()? {
            let staking_tx = store
                .get_staking_tx(&unbonding.staking_tx_hash)?
                .ok_or_else(|| {
                    DbError::CorruptedStore(format!(
                        "unbonding tx {} references missing staking tx {}",
                        unbonding.txid(),
                        unbonding.staking_tx_hash
                    ))
                })?;
            if staking_tx.is_overflow() {
                continue;
            }
            let params = registry.get_params_for_height(staking_tx.inclusion_height)?;
            tracker.release(params.version, staking_tx.staking_value);
        }

        debug!(total = %tracker.total(), "rebuilt confirmed TVL");
        Ok(tracker)
    }
}
