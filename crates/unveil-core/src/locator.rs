//! Content identifiers and their textual locator form.
//!
//! A content id is a 256-bit unsigned integer (the identifier the content
//! store uses natively). Its locator is the base64 encoding of the integer's
//! 32 little-endian bytes:
//!
//! ```text
//! 26318712447309950621133794408605739963587829295802287350894110878892617743117
//!   <-> "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo="
//! ```
//!
//! Encoding always emits the padded standard alphabet. Decoding also takes
//! the URL-safe alphabet and unpadded input, since content stores hand out
//! both forms.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// A 256-bit content identifier, stored little-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub [u8; 32]);

impl ContentId {
    /// The zero id.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from little-endian bytes.
    pub const fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the little-endian bytes.
    pub const fn as_le_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a `u128` value.
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(&value.to_le_bytes());
        Self(bytes)
    }

    /// Encode as a locator string.
    pub fn to_locator(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decode a locator string.
    pub fn from_locator(locator: &str) -> Result<Self> {
        let decoded = LENIENT_STANDARD
            .decode(locator)
            .or_else(|_| LENIENT_URL_SAFE.decode(locator))
            .map_err(|e| CoreError::InvalidLocator(format!("{}: {}", locator, e)))?;

        let bytes: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
            CoreError::InvalidLocator(format!(
                "{}: decodes to {} bytes, expected 32",
                locator,
                decoded.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Parse a decimal integer.
    pub fn from_decimal(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidContentId(format!("not a decimal integer: {:?}", s)));
        }

        let mut limbs = [0u64; 4];
        for digit in s.bytes().map(|b| (b - b'0') as u64) {
            // limbs = limbs * 10 + digit
            let mut carry = digit as u128;
            for limb in limbs.iter_mut() {
                let wide = (*limb as u128) * 10 + carry;
                *limb = wide as u64;
                carry = wide >> 64;
            }
            if carry != 0 {
                return Err(CoreError::InvalidContentId(format!("exceeds 256 bits: {}", s)));
            }
        }

        Ok(Self::from_limbs(limbs))
    }

    /// Format as a decimal integer.
    pub fn to_decimal(&self) -> String {
        let mut limbs = self.limbs();
        if limbs.iter().all(|&l| l == 0) {
            return "0".to_string();
        }

        let mut digits = Vec::with_capacity(78);
        while limbs.iter().any(|&l| l != 0) {
            // limbs = limbs / 10, collecting the remainder
            let mut rem: u128 = 0;
            for limb in limbs.iter_mut().rev() {
                let wide = (rem << 64) | (*limb as u128);
                *limb = (wide / 10) as u64;
                rem = wide % 10;
            }
            digits.push(b'0' + rem as u8);
        }

        digits.reverse();
        String::from_utf8(digits).unwrap_or_default()
    }

    fn limbs(&self) -> [u64; 4] {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(&self.0[i * 8..(i + 1) * 8]);
            *limb = u64::from_le_bytes(word);
        }
        limbs
    }

    fn from_limbs(limbs: [u64; 4]) -> Self {
        let mut bytes = [0u8; 32];
        for (i, limb) in limbs.iter().enumerate() {
            bytes[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_le_bytes());
        }
        Self(bytes)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.to_locator())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_decimal(s)
    }
}

impl From<[u8; 32]> for ContentId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
