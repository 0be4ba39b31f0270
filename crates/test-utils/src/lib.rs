//! Deterministic data generation for stakescan tests.

mod datagen;

pub use datagen::{
    build_staking_tx, build_unbonding_tx, gen_staking_data, gen_x_only_pk, test_params,
    test_registry, TestStakingData,
};
