//! Staking transaction format: OP_RETURN payload codec, taproot script
//! construction for the staking and unbonding outputs, and the parser that
//! recognizes staking transactions under a given parameter version.

mod errors;
pub mod op_return;
pub mod parser;
pub mod scripts;

pub use errors::{OpReturnError, StakingScriptError, StakingTxError};
pub use op_return::OpReturnData;
pub use parser::{parse_staking_tx, ParsedStakingTx};
