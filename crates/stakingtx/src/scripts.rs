//! Taproot script construction for staking and unbonding outputs.
//!
//! A staking output commits to three script paths behind an unspendable
//! internal key: a staker timelock path, an unbonding path guarded by the
//! covenant committee, and a slashing path guarded by the staker, the
//! finality provider and the committee. An unbonding output commits to the
//! timelock and slashing paths only, with the unbonding timelock.

use bitcoin::{
    opcodes::all::{
        OP_CHECKSIG, OP_CHECKSIGADD, OP_CHECKSIGVERIFY, OP_CSV, OP_NUMEQUAL, OP_NUMEQUALVERIFY,
    },
    secp256k1::Secp256k1,
    taproot::TaprootBuilder,
    ScriptBuf, XOnlyPublicKey,
};

use crate::errors::StakingScriptError;

/// The BIP-341 "nothing up my sleeve" point. Using it as the internal key
/// makes the key path unspendable, leaving only the committed script paths.
const UNSPENDABLE_KEY_PATH_KEY: [u8; 32] = [
    0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60, 0x35, 0xe9, 0x7a,
    0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5, 0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80,
    0x3a, 0xc0,
];

fn unspendable_internal_key() -> XOnlyPublicKey {
    XOnlyPublicKey::from_slice(&UNSPENDABLE_KEY_PATH_KEY).expect("valid NUMS point")
}

/// `<pk> OP_CHECKSIGVERIFY <blocks> OP_CSV`.
fn build_timelock_script(pk: &XOnlyPublicKey, blocks: u16) -> ScriptBuf {
    ScriptBuf::builder()
        .push_slice(pk.serialize())
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_int(blocks as i64)
        .push_opcode(OP_CSV)
        .into_script()
}

/// k-of-n Schnorr multisig over the covenant committee.
///
/// Keys participate sorted by their serialized bytes so the script is
/// independent of configuration order.
fn build_multisig_script(
    keys: &[XOnlyPublicKey],
    quorum: u32,
    with_verify: bool,
) -> Result<ScriptBuf, StakingScriptError> {
    if keys.is_empty() {
        return Err(StakingScriptError::EmptyCovenantCommittee);
    }
    if quorum == 0 || quorum as usize > keys.len() {
        return Err(StakingScriptError::InvalidCovenantQuorum {
            quorum,
            committee: keys.len(),
        });
    }

    if keys.len() == 1 {
        let builder = ScriptBuf::builder().push_slice(keys[0].serialize());
        let builder = if with_verify {
            builder.push_opcode(OP_CHECKSIGVERIFY)
        } else {
            builder.push_opcode(OP_CHECKSIG)
        };
        return Ok(builder.into_script());
    }

    let mut sorted = keys.to_vec();
    sorted.sort_by(|a, b| a.serialize().cmp(&b.serialize()));

    let mut builder = ScriptBuf::builder()
        .push_slice(sorted[0].serialize())
        .push_opcode(OP_CHECKSIG);
    for key in &sorted[1..] {
        builder = builder.push_slice(key.serialize()).push_opcode(OP_CHECKSIGADD);
    }
    builder = builder.push_int(quorum as i64);
    builder = if with_verify {
        builder.push_opcode(OP_NUMEQUALVERIFY)
    } else {
        builder.push_opcode(OP_NUMEQUAL)
    };

    Ok(builder.into_script())
}

/// Staker signature plus covenant quorum.
fn build_unbonding_path_script(
    staker_pk: &XOnlyPublicKey,
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
) -> Result<ScriptBuf, StakingScriptError> {
    let staker = ScriptBuf::builder()
        .push_slice(staker_pk.serialize())
        .push_opcode(OP_CHECKSIGVERIFY)
        .into_script();
    let covenant = build_multisig_script(covenant_pks, covenant_quorum, false)?;
    Ok(concat_scripts(&[staker, covenant]))
}

/// Staker and finality provider signatures plus covenant quorum.
fn build_slashing_path_script(
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
) -> Result<ScriptBuf, StakingScriptError> {
    let stakeholders = ScriptBuf::builder()
        .push_slice(staker_pk.serialize())
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_slice(finality_provider_pk.serialize())
        .push_opcode(OP_CHECKSIGVERIFY)
        .into_script();
    let covenant = build_multisig_script(covenant_pks, covenant_quorum, false)?;
    Ok(concat_scripts(&[stakeholders, covenant]))
}

fn concat_scripts(parts: &[ScriptBuf]) -> ScriptBuf {
    let mut bytes = Vec::new();
    for part in parts {
        bytes.extend_from_slice(part.as_bytes());
    }
    ScriptBuf::from_bytes(bytes)
}

/// Commits the given leaves into a P2TR script pubkey over the unspendable
/// internal key. Leaf order matters and is fixed by the callers.
fn taproot_script_pubkey(leaves: Vec<ScriptBuf>) -> Result<ScriptBuf, StakingScriptError> {
    let secp = Secp256k1::verification_only();
    let weighted = leaves.into_iter().map(|leaf| (1u32, leaf));
    let spend_info = TaprootBuilder::with_huffman_tree(weighted)
        .map_err(|_| StakingScriptError::TaprootAssembly)?
        .finalize(&secp, unspendable_internal_key())
        .map_err(|_| StakingScriptError::TaprootAssembly)?;
    Ok(ScriptBuf::new_p2tr_tweaked(spend_info.output_key()))
}

/// Script pubkey of the staking output derived from the staker, finality
/// provider, covenant committee and staking time.
pub fn staking_script_pubkey(
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
    staking_time: u16,
) -> Result<ScriptBuf, StakingScriptError> {
    let timelock = build_timelock_script(staker_pk, staking_time);
    let unbonding = build_unbonding_path_script(staker_pk, covenant_pks, covenant_quorum)?;
    let slashing =
        build_slashing_path_script(staker_pk, finality_provider_pk, covenant_pks, covenant_quorum)?;
    taproot_script_pubkey(vec![timelock, unbonding, slashing])
}

/// Script pubkey of the canonical unbonding output for a stake.
pub fn unbonding_script_pubkey(
    staker_pk: &XOnlyPublicKey,
    finality_provider_pk: &XOnlyPublicKey,
    covenant_pks: &[XOnlyPublicKey],
    covenant_quorum: u32,
    unbonding_time: u16,
) -> Result<ScriptBuf, StakingScriptError> {
    let timelock = build_timelock_script(staker_pk, unbonding_time);
    let slashing =
        build_slashing_path_script(staker_pk, finality_provider_pk, covenant_pks, covenant_quorum)?;
    taproot_script_pubkey(vec![timelock, slashing])
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::{Keypair, SecretKey};

    use super::*;

    fn pk(seed: u8) -> XOnlyPublicKey {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
        XOnlyPublicKey::from_keypair(&Keypair::from_secret_key(&secp, &sk)).0
    }

    fn committee() -> Vec<XOnlyPublicKey> {
        vec![pk(11), pk(12), pk(13)]
    }

    #[test]
    fn staking_script_is_deterministic() {
        let a = staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        let b = staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        assert_eq!(a, b);
        assert!(a.is_p2tr());
    }

    #[test]
    fn staking_script_depends_on_every_field() {
        let base = staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        assert_ne!(
            base,
            staking_script_pubkey(&pk(3), &pk(2), &committee(), 2, 500).unwrap()
        );
        assert_ne!(
            base,
            staking_script_pubkey(&pk(1), &pk(4), &committee(), 2, 500).unwrap()
        );
        assert_ne!(
            base,
            staking_script_pubkey(&pk(1), &pk(2), &committee(), 3, 500).unwrap()
        );
        assert_ne!(
            base,
            staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 501).unwrap()
        );
    }

    #[test]
    fn multisig_is_invariant_under_committee_order() {
        let mut reversed = committee();
        reversed.reverse();
        let a = staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        let b = staking_script_pubkey(&pk(1), &pk(2), &reversed, 2, 500).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unbonding_script_differs_from_staking_script() {
        let staking = staking_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        let unbonding = unbonding_script_pubkey(&pk(1), &pk(2), &committee(), 2, 500).unwrap();
        assert_ne!(staking, unbonding);
    }

    #[test]
    fn rejects_empty_committee() {
        assert_eq!(
            staking_script_pubkey(&pk(1), &pk(2), &[], 1, 500),
            Err(StakingScriptError::EmptyCovenantCommittee)
        );
    }

    #[test]
    fn rejects_oversized_quorum() {
        assert_eq!(
            staking_script_pubkey(&pk(1), &pk(2), &committee(), 4, 500),
            Err(StakingScriptError::InvalidCovenantQuorum {
                quorum: 4,
                committee: 3
            })
        );
    }

    #[test]
    fn single_key_committee_degenerates_to_checksig() {
        let script = build_multisig_script(&[pk(5)], 1, false).unwrap();
        let bytes = script.as_bytes();
        assert_eq!(bytes[0], 0x20, "32-byte key push");
        assert_eq!(*bytes.last().unwrap(), OP_CHECKSIG.to_u8());
    }
}
