//! Serde helper modules for parameter file fields.

use bitcoin::Amount;
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize [`Amount`] as integer satoshis ([`u64`]).
pub mod serde_amount_sat {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Amount, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(v.to_sat())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
        let sats = u64::deserialize(d)?;
        Ok(Amount::from_sat(sats))
    }
}

/// Serialize/deserialize the 4-byte protocol tag as a hex string.
pub mod serde_magic_bytes {
    use serde::de::Error;

    use super::*;
    use crate::MAGIC_BYTES_LEN;

    pub fn serialize<S: Serializer>(v: &[u8; MAGIC_BYTES_LEN], s: S) -> Result<S::Ok, S::Error> {
        let mut out = String::with_capacity(MAGIC_BYTES_LEN * 2);
        for b in v {
            out.push_str(&format!("{b:02x}"));
        }
        s.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; MAGIC_BYTES_LEN], D::Error> {
        let raw = String::deserialize(d)?;
        if raw.len() != MAGIC_BYTES_LEN * 2 {
            return Err(D::Error::custom(format!(
                "tag must be {} hex chars, got {}",
                MAGIC_BYTES_LEN * 2,
                raw.len()
            )));
        }
        let mut out = [0u8; MAGIC_BYTES_LEN];
        for (i, chunk) in raw.as_bytes().chunks(2).enumerate() {
            let chunk = std::str::from_utf8(chunk).map_err(D::Error::custom)?;
            out[i] = u8::from_str_radix(chunk, 16).map_err(D::Error::custom)?;
        }
        Ok(out)
    }
}
