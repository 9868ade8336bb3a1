//! Canonical byte encoding of reveal content.
//!
//! The commitment published at mint time is a hash over these bytes, so the
//! encoding has to be reproduced bit for bit at reveal time. The layout is:
//!
//! ```text
//! number || pairs || locator
//! ```
//!
//! with no separators and no length prefixes. Two choices vary between
//! deployments and are captured by [`CommitmentScheme`]:
//!
//! - how `number` is written (decimal ASCII or 8 raw little-endian bytes),
//! - how pairs are laid out (`k0 v0 k1 v1 ...` or `k0 k1 ... v0 v1 ...`).
//!
//! Arrays are always walked front to back.
//!
//! **CRITICAL**: A scheme is FROZEN once a collection has minted against it.
//! Schemes produce different digests for identical input and never mix.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// How the sequence number is written into the canonical input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberEncoding {
    /// ASCII decimal digits, no sign, no leading zeros (`100` -> `b"100"`).
    #[default]
    Decimal,
    /// 8 bytes, little-endian.
    RawLe64,
}

/// How attribute keys and values are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairOrder {
    /// `key[0] value[0] key[1] value[1] ...`
    #[default]
    Interleaved,
    /// `key[0] key[1] ... value[0] value[1] ...`
    KeysThenValues,
}

/// A fixed canonicalization for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CommitmentScheme {
    #[serde(default)]
    pub number: NumberEncoding,
    #[serde(default)]
    pub pairs: PairOrder,
}

impl CommitmentScheme {
    /// Decimal number, interleaved pairs.
    pub const STANDARD: Self = Self {
        number: NumberEncoding::Decimal,
        pairs: PairOrder::Interleaved,
    };

    /// Build the canonical input bytes.
    ///
    /// `keys` and `values` must have equal length. Duplicate keys are not
    /// rejected here; they are hashed exactly as given.
    pub fn canonical_input<K, V>(
        &self,
        number: u64,
        keys: &[K],
        values: &[V],
        locator: &str,
    ) -> Result<Vec<u8>>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        check_pair_lengths(keys.len(), values.len())?;

        let payload: usize = keys.iter().map(|k| k.as_ref().len()).sum::<usize>()
            + values.iter().map(|v| v.as_ref().len()).sum::<usize>();
        let mut buf = Vec::with_capacity(20 + payload + locator.len());

        match self.number {
            NumberEncoding::Decimal => buf.extend_from_slice(number.to_string().as_bytes()),
            NumberEncoding::RawLe64 => buf.extend_from_slice(&number.to_le_bytes()),
        }

        match self.pairs {
            PairOrder::Interleaved => {
                for (key, value) in keys.iter().zip(values) {
                    buf.extend_from_slice(key.as_ref().as_bytes());
                    buf.extend_from_slice(value.as_ref().as_bytes());
                }
            }
            PairOrder::KeysThenValues => {
                for key in keys {
                    buf.extend_from_slice(key.as_ref().as_bytes());
                }
                for value in values {
                    buf.extend_from_slice(value.as_ref().as_bytes());
                }
            }
        }

        buf.extend_from_slice(locator.as_bytes());
        Ok(buf)
    }
}

/// Reject attribute arrays of unequal length.
pub fn check_pair_lengths(keys: usize, values: usize) -> Result<()> {
    if keys != values {
        return Err(CoreError::InvalidLength(format!(
            "{} attribute keys but {} values",
            keys, values
        )));
    }
    Ok(())
}
