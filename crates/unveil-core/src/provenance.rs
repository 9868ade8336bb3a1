//! Provenance commitments: the digest that binds a minted asset to the
//! content it will reveal later.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::CommitmentScheme;
use crate::crypto::Sha256Hash;
use crate::error::{CoreError, Result};

/// A commitment as published at mint time.
///
/// Commitments are computed off-system by the minting party and stored
/// verbatim; the kernel never normalizes them. A commitment that is not the
/// lowercase hex of the right digest simply never verifies.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvenanceCommitment(String);

impl ProvenanceCommitment {
    /// Wrap an opaque commitment string.
    pub fn new(commitment: impl Into<String>) -> Self {
        Self(commitment.into())
    }

    /// Compute the commitment for the given reveal content.
    pub fn compute<K, V>(
        scheme: &CommitmentScheme,
        number: u64,
        keys: &[K],
        values: &[V],
        locator: &str,
    ) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        digest_with(scheme, number, keys, values, locator).map(Self)
    }

    /// The commitment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the commitment text.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Check reveal content against this commitment.
    ///
    /// Fails with [`CoreError::ProvenanceMismatch`] on any difference.
    pub fn verify<K, V>(
        &self,
        scheme: &CommitmentScheme,
        number: u64,
        keys: &[K],
        values: &[V],
        locator: &str,
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let computed = digest_with(scheme, number, keys, values, locator)?;
        if computed != self.0 {
            return Err(CoreError::ProvenanceMismatch {
                committed: self.0.clone(),
                computed,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ProvenanceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(16).collect();
        write!(f, "Commitment({})", prefix)
    }
}

impl fmt::Display for ProvenanceCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProvenanceCommitment {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProvenanceCommitment {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Digest reveal content under the standard scheme.
///
/// Returns the lowercase hex SHA-256 of
/// `decimal(number) || k0 || v0 || k1 || v1 || ... || locator`.
pub fn digest<K, V>(number: u64, keys: &[K], values: &[V], locator: &str) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    digest_with(&CommitmentScheme::STANDARD, number, keys, values, locator)
}

/// Digest reveal content under an explicit scheme.
pub fn digest_with<K, V>(
    scheme: &CommitmentScheme,
    number: u64,
    keys: &[K],
    values: &[V],
    locator: &str,
) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let input = scheme.canonical_input(number, keys, values, locator)?;
    Ok(Sha256Hash::hash(&input).to_hex())
}
