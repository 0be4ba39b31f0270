use std::{collections::HashSet, path::Path};

use bitcoin::Amount;
use serde::Deserialize;

use crate::{errors::ParamsError, types::StakingParams};

/// Ordered, validated history of staking parameter versions.
///
/// Versions are immutable after construction and sorted by activation height
/// strictly ascending, so lookup by height is a binary search.
#[derive(Clone, Debug)]
pub struct ParamsRegistry {
    versions: Vec<StakingParams>,
}

impl ParamsRegistry {
    /// Validates and wraps a parameter version list.
    pub fn new(versions: Vec<StakingParams>) -> Result<Self, ParamsError> {
        let first = versions.first().ok_or(ParamsError::EmptyRegistry)?;
        if first.activation_height == 0 {
            return Err(ParamsError::ZeroActivationHeight);
        }

        let mut last_height = 0u64;
        let mut last_version: Option<u16> = None;
        for params in &versions {
            if params.activation_height <= last_height {
                return Err(ParamsError::UnorderedActivationHeights {
                    version: params.version,
                    height: params.activation_height,
                });
            }
            last_height = params.activation_height;

            if last_version.is_some_and(|prev| params.version <= prev) {
                return Err(ParamsError::UnorderedVersionNumbers(params.version));
            }
            last_version = Some(params.version);

            validate_version(params)?;
        }

        Ok(Self { versions })
    }

    /// Returns the parameter version active at height `h`: the version with
    /// the greatest activation height not exceeding `h`.
    pub fn get_params_for_height(&self, h: u64) -> Result<&StakingParams, ParamsError> {
        let idx = self
            .versions
            .partition_point(|v| v.activation_height <= h);
        if idx == 0 {
            return Err(ParamsError::NotYetActivated(h));
        }
        Ok(&self.versions[idx - 1])
    }

    /// Read-only iteration over all versions, for startup diagnostics.
    pub fn versions(&self) -> impl Iterator<Item = &StakingParams> {
        self.versions.iter()
    }

    /// Activation height of the earliest version.
    pub fn first_activation_height(&self) -> u64 {
        self.versions[0].activation_height
    }

    /// Parses and validates a registry from its JSON representation.
    pub fn from_json(raw: &str) -> Result<Self, ParamsError> {
        let file: ParamsFile = serde_json::from_str(raw)?;
        Self::new(file.versions)
    }
}

fn validate_version(params: &StakingParams) -> Result<(), ParamsError> {
    let version = params.version;

    if params.covenant_pks.is_empty() {
        return Err(ParamsError::EmptyCovenantCommittee { version });
    }
    let distinct: HashSet<_> = params.covenant_pks.iter().map(|pk| pk.serialize()).collect();
    if distinct.len() != params.covenant_pks.len() {
        return Err(ParamsError::DuplicateCovenantKey { version });
    }
    if params.covenant_quorum == 0 || params.covenant_quorum as usize > params.covenant_pks.len() {
        return Err(ParamsError::InvalidCovenantQuorum {
            version,
            quorum: params.covenant_quorum,
            committee: params.covenant_pks.len(),
        });
    }

    if params.min_staking_value == Amount::ZERO
        || params.min_staking_value > params.max_staking_value
    {
        return Err(ParamsError::InvalidValueBounds { version });
    }
    if params.min_staking_time == 0 || params.min_staking_time > params.max_staking_time {
        return Err(ParamsError::InvalidTimeBounds { version });
    }
    if params.unbonding_time == 0 {
        return Err(ParamsError::ZeroUnbondingTime { version });
    }
    if params.unbonding_fee >= params.min_staking_value {
        return Err(ParamsError::ExcessiveUnbondingFee { version });
    }
    if params.staking_cap < params.max_staking_value {
        return Err(ParamsError::CapBelowMaxStake { version });
    }

    Ok(())
}

/// Loads a parameter registry from a JSON file.
pub fn load_params(path: &Path) -> Result<ParamsRegistry, ParamsError> {
    let raw = std::fs::read_to_string(path)?;
    ParamsRegistry::from_json(&raw)
}

/// On-disk shape of the parameters file.
#[derive(Debug, Deserialize)]
struct ParamsFile {
    versions: Vec<StakingParams>,
}

#[cfg(test)]
mod tests {
    use bitcoin::{
        secp256k1::{Keypair, Secp256k1, SecretKey},
        XOnlyPublicKey,
    };

    use super::*;

    fn pk(seed: u8) -> XOnlyPublicKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
        XOnlyPublicKey::from_keypair(&Keypair::from_secret_key(&secp, &sk)).0
    }

    fn version(n: u16, activation_height: u64) -> StakingParams {
        StakingParams {
            version: n,
            activation_height,
            tag: *b"stk0",
            covenant_pks: vec![pk(1), pk(2), pk(3)],
            covenant_quorum: 2,
            unbonding_time: 100,
            unbonding_fee: Amount::from_sat(500),
            min_staking_value: Amount::from_sat(1_000),
            max_staking_value: Amount::from_sat(100_000),
            min_staking_time: 10,
            max_staking_time: 65_000,
            staking_cap: Amount::from_sat(500_000),
        }
    }

    #[test]
    fn selects_greatest_activation_at_or_below_height() {
        let registry =
            ParamsRegistry::new(vec![version(0, 100), version(1, 200), version(2, 300)]).unwrap();

        assert_eq!(registry.get_params_for_height(100).unwrap().version, 0);
        assert_eq!(registry.get_params_for_height(199).unwrap().version, 0);
        assert_eq!(registry.get_params_for_height(200).unwrap().version, 1);
        assert_eq!(registry.get_params_for_height(299).unwrap().version, 1);
        assert_eq!(registry.get_params_for_height(300).unwrap().version, 2);
        assert_eq!(registry.get_params_for_height(10_000).unwrap().version, 2);
    }

    #[test]
    fn rejects_heights_before_first_activation() {
        let registry = ParamsRegistry::new(vec![version(0, 100)]).unwrap();
        assert!(matches!(
            registry.get_params_for_height(99),
            Err(ParamsError::NotYetActivated(99))
        ));
    }

    #[test]
    fn rejects_empty_registry() {
        assert!(matches!(
            ParamsRegistry::new(vec![]),
            Err(ParamsError::EmptyRegistry)
        ));
    }

    #[test]
    fn rejects_unordered_activation_heights() {
        let result = ParamsRegistry::new(vec![version(0, 200), version(1, 200)]);
        assert!(matches!(
            result,
            Err(ParamsError::UnorderedActivationHeights { .. })
        ));
    }

    #[test]
    fn rejects_unordered_version_numbers() {
        let result = ParamsRegistry::new(vec![version(1, 100), version(1, 200)]);
        assert!(matches!(
            result,
            Err(ParamsError::UnorderedVersionNumbers(1))
        ));
    }

    #[test]
    fn rejects_invalid_quorum() {
        let mut bad = version(0, 100);
        bad.covenant_quorum = 4;
        assert!(matches!(
            ParamsRegistry::new(vec![bad]),
            Err(ParamsError::InvalidCovenantQuorum { .. })
        ));
    }

    #[test]
    fn rejects_fee_at_or_above_min_stake() {
        let mut bad = version(0, 100);
        bad.unbonding_fee = bad.min_staking_value;
        assert!(matches!(
            ParamsRegistry::new(vec![bad]),
            Err(ParamsError::ExcessiveUnbondingFee { version: 0 })
        ));
    }

    #[test]
    fn rejects_cap_below_max_stake() {
        let mut bad = version(0, 100);
        bad.staking_cap = Amount::from_sat(50_000);
        assert!(matches!(
            ParamsRegistry::new(vec![bad]),
            Err(ParamsError::CapBelowMaxStake { version: 0 })
        ));
    }

    #[test]
    fn parses_registry_from_json() {
        let covenant = [pk(1), pk(2), pk(3)]
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(",");
        let raw = format!(
            r#"{{
              "versions": [
                {{
                  "version": 0,
                  "activation_height": 100,
                  "tag": "73746b30",
                  "covenant_pks": [{covenant}],
                  "covenant_quorum": 2,
                  "unbonding_time": 100,
                  "unbonding_fee": 500,
                  "min_staking_value": 1000,
                  "max_staking_value": 100000,
                  "min_staking_time": 10,
                  "max_staking_time": 65000,
                  "staking_cap": 500000
                }}
              ]
            }}"#
        );

        let registry = ParamsRegistry::from_json(&raw).unwrap();
        let params = registry.get_params_for_height(150).unwrap();
        assert_eq!(params.tag, *b"stk0");
        assert_eq!(params.unbonding_fee, Amount::from_sat(500));
        assert_eq!(params.covenant_pks.len(), 3);
    }
}
