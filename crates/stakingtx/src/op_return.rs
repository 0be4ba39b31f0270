//! The tagged OP_RETURN payload embedded in every staking transaction.
//!
//! Wire layout (71 bytes):
//! `magic(4) || version(1) || staker_pk(32) || finality_provider_pk(32) ||
//! staking_time(2, big-endian)`.

use bitcoin::{
    opcodes::all::OP_RETURN,
    script::{Instruction, PushBytesBuf},
    Script, ScriptBuf, XOnlyPublicKey,
};
use stakescan_params::MAGIC_BYTES_LEN;

use crate::errors::OpReturnError;

/// Payload version understood by this parser.
pub const SUPPORTED_VERSION: u8 = 0;

const VERSION_LEN: usize = 1;
const PK_LEN: usize = 32;
const STAKING_TIME_LEN: usize = 2;

/// Total length of a v0 payload.
pub const V0_PAYLOAD_LEN: usize =
    MAGIC_BYTES_LEN + VERSION_LEN + 2 * PK_LEN + STAKING_TIME_LEN;

/// Decoded staking OP_RETURN payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpReturnData {
    pub magic: [u8; MAGIC_BYTES_LEN],
    pub version: u8,
    pub staker_pk: XOnlyPublicKey,
    pub finality_provider_pk: XOnlyPublicKey,
    /// Staking period in blocks.
    pub staking_time: u16,
}

impl OpReturnData {
    /// Decodes a payload that is already known to start with the expected
    /// tag. Length and version mismatches are reported distinctly from key
    /// decoding failures so the caller can tell "not ours" from "ours but
    /// broken".
    pub fn decode(payload: &[u8]) -> Result<Self, OpReturnError> {
        if payload.len() != V0_PAYLOAD_LEN {
            return Err(OpReturnError::BadLength(payload.len()));
        }

        let (magic_bytes, rest) = payload.split_at(MAGIC_BYTES_LEN);
        let magic: [u8; MAGIC_BYTES_LEN] = magic_bytes.try_into().expect("split is 4 bytes");

        let (version_bytes, rest) = rest.split_at(VERSION_LEN);
        let version = version_bytes[0];
        if version != SUPPORTED_VERSION {
            return Err(OpReturnError::UnsupportedVersion(version));
        }

        let (staker_bytes, rest) = rest.split_at(PK_LEN);
        let staker_pk = XOnlyPublicKey::from_slice(staker_bytes)
            .map_err(|_| OpReturnError::InvalidStakerKey)?;

        let (fp_bytes, time_bytes) = rest.split_at(PK_LEN);
        let finality_provider_pk = XOnlyPublicKey::from_slice(fp_bytes)
            .map_err(|_| OpReturnError::InvalidFinalityProviderKey)?;

        let staking_time = u16::from_be_bytes(time_bytes.try_into().expect("split is 2 bytes"));

        Ok(Self {
            magic,
            version,
            staker_pk,
            finality_provider_pk,
            staking_time,
        })
    }

    /// Encodes the payload into its 71-byte wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(V0_PAYLOAD_LEN);
        out.extend_from_slice(&self.magic);
        out.push(self.version);
        out.extend_from_slice(&self.staker_pk.serialize());
        out.extend_from_slice(&self.finality_provider_pk.serialize());
        out.extend_from_slice(&self.staking_time.to_be_bytes());
        out
    }

    /// Builds the `OP_RETURN <payload>` script carrying this data.
    pub fn to_script(&self) -> ScriptBuf {
        let data = PushBytesBuf::try_from(self.encode()).expect("payload fits a push");
        ScriptBuf::new_op_return(data)
    }
}

/// Extracts the single pushed payload from an `OP_RETURN <data>` script.
///
/// Returns `None` for any other script shape, including bare OP_RETURN and
/// multi-push OP_RETURN outputs.
pub fn extract_op_return_payload(script: &Script) -> Option<&[u8]> {
    if !script.is_op_return() {
        return None;
    }

    let mut instructions = script.instructions();
    match instructions.next()?.ok()? {
        Instruction::Op(op) if op == OP_RETURN => {}
        _ => return None,
    }
    let payload = match instructions.next()?.ok()? {
        Instruction::PushBytes(bytes) => bytes.as_bytes(),
        _ => return None,
    };
    if instructions.next().is_some() {
        return None;
    }
    Some(payload)
}
