//! Domain record types and their borsh wire forms.
//!
//! The store persists the wire records; everything above the store layer
//! works with the decoded domain types.

use bitcoin::{
    consensus,
    hashes::Hash,
    Amount, Transaction, Txid, XOnlyPublicKey,
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::errors::DbError;

/// Whether a stake counts towards confirmed TVL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EligibilityStatus {
    /// Admitted under the staking cap.
    Active,
    /// Confirmed past the cap (overflow); recorded but not counted.
    Inactive,
}

impl EligibilityStatus {
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Inactive)
    }

    fn from_overflow(is_overflow: bool) -> Self {
        if is_overflow {
            Self::Inactive
        } else {
            Self::Active
        }
    }
}

impl std::fmt::Display for EligibilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

/// A staking transaction as stored, with its protocol-relevant fields
/// decoded. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredStakingTx {
    pub tx: Transaction,
    pub staking_output_idx: u32,
    pub inclusion_height: u64,
    pub staker_pk: XOnlyPublicKey,
    pub staking_time: u16,
    pub finality_provider_pk: XOnlyPublicKey,
    pub staking_value: Amount,
    pub status: EligibilityStatus,
}

impl StoredStakingTx {
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn is_overflow(&self) -> bool {
        self.status.is_overflow()
    }
}

/// An unbonding transaction as stored, linked to the stake it spends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredUnbondingTx {
    pub tx: Transaction,
    pub staking_tx_hash: Txid,
}

impl StoredUnbondingTx {
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }
}

/// Wire form of a stored staking transaction.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct StakingTxRecord {
    pub transaction_bytes: Vec<u8>,
    pub staking_output_idx: u32,
    pub inclusion_height: u64,
    pub staker_pk: [u8; 32],
    pub staking_time: u32,
    pub finality_provider_pk: [u8; 32],
    pub staking_value: u64,
    pub is_overflow: bool,
}

/// Wire form of a stored unbonding transaction.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub struct UnbondingTxRecord {
    pub transaction_bytes: Vec<u8>,
    pub staking_tx_hash: [u8; 32],
}

impl From<&StoredStakingTx> for StakingTxRecord {
    fn from(tx: &StoredStakingTx) -> Self {
        Self {
            transaction_bytes: consensus::encode::serialize(&tx.tx),
            staking_output_idx: tx.staking_output_idx,
            inclusion_height: tx.inclusion_height,
            staker_pk: tx.staker_pk.serialize(),
            staking_time: tx.staking_time as u32,
            finality_provider_pk: tx.finality_provider_pk.serialize(),
            staking_value: tx.staking_value.to_sat(),
            is_overflow: tx.status.is_overflow(),
        }
    }
}

impl TryFrom<StakingTxRecord> for StoredStakingTx {
    type Error = DbError;

    fn try_from(record: StakingTxRecord) -> Result<Self, Self::Error> {
        let tx: Transaction = consensus::encode::deserialize(&record.transaction_bytes)
            .map_err(|e| DbError::CorruptedStore(format!("invalid staking tx bytes: {e}")))?;
        let staker_pk = XOnlyPublicKey::from_slice(&record.staker_pk)
            .map_err(|e| DbError::CorruptedStore(format!("invalid staker pk: {e}")))?;
        let finality_provider_pk = XOnlyPublicKey::from_slice(&record.finality_provider_pk)
            .map_err(|e| DbError::CorruptedStore(format!("invalid finality provider pk: {e}")))?;
        let staking_time = u16::try_from(record.staking_time)
            .map_err(|_| DbError::CorruptedStore("staking time out of range".into()))?;

        Ok(Self {
            tx,
            staking_output_idx: record.staking_output_idx,
            inclusion_height: record.inclusion_height,
            staker_pk,
            staking_time,
            finality_provider_pk,
            staking_value: Amount::from_sat(record.staking_value),
            status: EligibilityStatus::from_overflow(record.is_overflow),
        })
    }
}

impl From<&StoredUnbondingTx> for UnbondingTxRecord {
    fn from(tx: &StoredUnbondingTx) -> Self {
        Self {
            transaction_bytes: consensus::encode::serialize(&tx.tx),
            staking_tx_hash: tx.staking_tx_hash.to_byte_array(),
        }
    }
}

impl TryFrom<UnbondingTxRecord> for StoredUnbondingTx {
    type Error = DbError;

    fn try_from(record: UnbondingTxRecord) -> Result<Self, Self::Error> {
        let tx: Transaction = consensus::encode::deserialize(&record.transaction_bytes)
            .map_err(|e| DbError::CorruptedStore(format!("invalid unbonding tx bytes: {e}")))?;
        Ok(Self {
            tx,
            staking_tx_hash: Txid::from_byte_array(record.staking_tx_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        absolute::LockTime,
        secp256k1::{Keypair, Secp256k1, SecretKey},
        transaction::Version,
        OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Witness,
    };

    use super::*;

    fn pk(seed: u8) -> XOnlyPublicKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
        XOnlyPublicKey::from_keypair(&Keypair::from_secret_key(&secp, &sk)).0
    }

    fn sample_tx() -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: Txid::all_zeros(),
                    vout: 0,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(5_000),
                script_pubkey: ScriptBuf::new(),
            }],
        }
    }

    #[test]
    fn staking_record_round_trips() {
        let stored = StoredStakingTx {
            tx: sample_tx(),
            staking_output_idx: 0,
            inclusion_height: 123,
            staker_pk: pk(1),
            staking_time: 500,
            finality_provider_pk: pk(2),
            staking_value: Amount::from_sat(5_000),
            status: EligibilityStatus::Active,
        };

        let record = StakingTxRecord::from(&stored);
        let decoded = StoredStakingTx::try_from(record).unwrap();
        assert_eq!(decoded, stored);
        assert_eq!(decoded.txid(), stored.tx.compute_txid());
    }

    #[test]
    fn unbonding_record_round_trips() {
        let stored = StoredUnbondingTx {
            tx: sample_tx(),
            staking_tx_hash: sample_tx().compute_txid(),
        };
        let record = UnbondingTxRecord::from(&stored);
        assert_eq!(StoredUnbondingTx::try_from(record).unwrap(), stored);
    }

    #[test]
    fn truncated_tx_bytes_surface_as_corruption() {
        let stored = StoredStakingTx {
            tx: sample_tx(),
            staking_output_idx: 0,
            inclusion_height: 123,
            staker_pk: pk(1),
            staking_time: 500,
            finality_provider_pk: pk(2),
            staking_value: Amount::from_sat(5_000),
            status: EligibilityStatus::Inactive,
        };
        let mut record = StakingTxRecord::from(&stored);
        record.transaction_bytes.truncate(4);
        assert!(matches!(
            StoredStakingTx::try_from(record),
            Err(DbError::CorruptedStore(_))
        ));
    }
}
