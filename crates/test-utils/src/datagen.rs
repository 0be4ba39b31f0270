use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    secp256k1::{Keypair, Secp256k1, SecretKey},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
    XOnlyPublicKey,
};
use rand::Rng;
use stakescan_params::{ParamsRegistry, StakingParams};
use stakescan_stakingtx::{
    op_return::SUPPORTED_VERSION,
    scripts::{staking_script_pubkey, unbonding_script_pubkey},
    OpReturnData,
};

/// The inputs a staker chooses when building a staking transaction.
#[derive(Clone, Copy, Debug)]
pub struct TestStakingData {
    pub staker_pk: XOnlyPublicKey,
    pub finality_provider_pk: XOnlyPublicKey,
    pub staking_time: u16,
    pub staking_value: Amount,
}

/// Derives an x-only key from rng output.
pub fn gen_x_only_pk<R: Rng>(rng: &mut R) -> XOnlyPublicKey {
    let secp = Secp256k1::new();
    loop {
        let bytes: [u8; 32] = rng.gen();
        if let Ok(sk) = SecretKey::from_slice(&bytes) {
            return XOnlyPublicKey::from_keypair(&Keypair::from_secret_key(&secp, &sk)).0;
        }
    }
}

/// A fixed single-version parameter set used across tests.
pub fn test_params() -> StakingParams {
    let mut rng = seeded_rng(0xC0FFEE);
    StakingParams {
        version: 0,
        activation_height: 100,
        tag: *b"stk0",
        covenant_pks: vec![
            gen_x_only_pk(&mut rng),
            gen_x_only_pk(&mut rng),
            gen_x_only_pk(&mut rng),
        ],
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

/// A two-version registry: v0 activates at 100, v1 at 200 with a larger cap
/// and a different unbonding fee.
pub fn test_registry() -> ParamsRegistry {
    let v0 = test_params();
    let mut v1 = test_params();
    v1.version = 1;
    v1.activation_height = 200;
    v1.staking_cap = Amount::from_sat(800_000);
    v1.unbonding_fee = Amount::from_sat(800);
    ParamsRegistry::new(vec![v0, v1]).expect("test params are valid")
}

fn seeded_rng(seed: u64) -> impl Rng {
    use rand::SeedableRng;
    rand::rngs::StdRng::seed_from_u64(seed)
}

/// Generates staking data within the bounds of `params`.
pub fn gen_staking_data<R: Rng>(rng: &mut R, params: &StakingParams) -> TestStakingData {
    TestStakingData {
        staker_pk: gen_x_only_pk(rng),
        finality_provider_pk: gen_x_only_pk(rng),
        staking_time: rng.gen_range(params.min_staking_time..=params.max_staking_time),
        staking_value: Amount::from_sat(
            rng.gen_range(params.min_staking_value.to_sat()..=params.max_staking_value.to_sat()),
        ),
    }
}

fn dummy_input<R: Rng>(rng: &mut R) -> TxIn {
    let funding_txid: [u8; 32] = rng.gen();
    TxIn {
        previous_output: OutPoint {
            txid: Txid::from_byte_array(funding_txid),
            vout: 0,
        },
        script_sig: ScriptBuf::new(),
        sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
        witness: Witness::new(),
    }
}

/// Builds a well-formed staking transaction: output 0 is the staking output,
/// output 1 the tagged OP_RETURN. The input spends a random funding outpoint
/// so every generated transaction has a distinct hash.
pub fn build_staking_tx<R: Rng>(
    rng: &mut R,
    params: &StakingParams,
    data: &TestStakingData,
) -> Transaction {
    let spk = staking_script_pubkey(
        &data.staker_pk,
        &data.finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        data.staking_time,
    )
    .expect("valid script inputs");

    let op_return = OpReturnData {
        magic: params.tag,
        version: SUPPORTED_VERSION,
        staker_pk: data.staker_pk,
        finality_provider_pk: data.finality_provider_pk,
        staking_time: data.staking_time,
    };

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![dummy_input(rng)],
        output: vec![
            TxOut {
                value: data.staking_value,
                script_pubkey: spk,
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: op_return.to_script(),
            },
        ],
    }
}

/// Builds the canonical unbonding transaction for a stake, spending
/// `staking_output_idx` of `staking_txid`. Passing an index other than the
/// real staking output produces the wrong-index shape used in tests.
pub fn build_unbonding_tx(
    params: &StakingParams,
    data: &TestStakingData,
    staking_txid: Txid,
    staking_output_idx: u32,
) -> Transaction {
    let spk = unbonding_script_pubkey(
        &data.staker_pk,
        &data.finality_provider_pk,
        &params.covenant_pks,
        params.covenant_quorum,
        params.unbonding_time,
    )
    .expect("valid script inputs");

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: staking_txid,
                vout: staking_output_idx,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: data.staking_value - params.unbonding_fee,
            script_pubkey: spk,
        }],
    }
}
