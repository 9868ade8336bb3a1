//! Asset records: minted with a commitment, revealed once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::canonical::{check_pair_lengths, CommitmentScheme};
use crate::error::{CoreError, Result};
use crate::locator::ContentId;
use crate::provenance::ProvenanceCommitment;
use crate::types::{AssetId, CollectionId};
use crate::validation::build_attributes;

/// Placeholder metadata and commitment supplied by the minting party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub name: String,
    pub description: String,
    pub external_url: String,
    pub provenance_commitment: ProvenanceCommitment,
}

impl MintRequest {
    /// Create a request with an empty external URL.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        provenance_commitment: impl Into<ProvenanceCommitment>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            external_url: String::new(),
            provenance_commitment: provenance_commitment.into(),
        }
    }

    /// Set the external URL.
    pub fn external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = url.into();
        self
    }
}

/// A minted asset.
///
/// Fields are read-only from outside this crate. `provenance_commitment` is
/// fixed at mint; `attributes` and `content_locator` are filled exactly once
/// by [`AssetRecord::prepare_reveal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    id: AssetId,
    collection_id: CollectionId,
    number: u64,
    name: String,
    description: String,
    external_url: String,
    provenance_commitment: ProvenanceCommitment,
    attributes: BTreeMap<String, String>,
    content_locator: Option<String>,
}

impl AssetRecord {
    /// Create the record for a freshly admitted sequence number.
    pub fn mint(collection_id: CollectionId, number: u64, request: MintRequest) -> Self {
        Self {
            id: AssetId::derive(&collection_id, number),
            collection_id,
            number,
            name: request.name,
            description: request.description,
            external_url: request.external_url,
            provenance_commitment: request.provenance_commitment,
            attributes: BTreeMap::new(),
            content_locator: None,
        }
    }

    pub fn id(&self) -> &AssetId {
        &self.id
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.collection_id
    }

    /// 1-based sequence number within the collection.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn external_url(&self) -> &str {
        &self.external_url
    }

    pub fn provenance_commitment(&self) -> &ProvenanceCommitment {
        &self.provenance_commitment
    }

    /// Revealed attributes; empty until reveal.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Revealed content locator; `None` until reveal.
    pub fn content_locator(&self) -> Option<&str> {
        self.content_locator.as_deref()
    }

    pub fn is_revealed(&self) -> bool {
        self.content_locator.is_some()
    }

    /// Decode the revealed locator into a content id.
    pub fn content_id(&self) -> Option<Result<ContentId>> {
        self.content_locator.as_deref().map(ContentId::from_locator)
    }

    /// Fail if the asset has already been revealed.
    pub fn ensure_unrevealed(&self) -> Result<()> {
        if self.is_revealed() {
            return Err(CoreError::AlreadyRevealed(self.number));
        }
        Ok(())
    }

    /// Verify reveal content and return the revealed copy.
    ///
    /// `self` is left untouched, so a failure at any step (already revealed,
    /// unequal lengths, digest mismatch, duplicate key) has no effect.
    pub fn prepare_reveal<K, V>(
        &self,
        scheme: &CommitmentScheme,
        keys: &[K],
        values: &[V],
        locator: &str,
    ) -> Result<AssetRecord>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.ensure_unrevealed()?;
        check_pair_lengths(keys.len(), values.len())?;

        self.provenance_commitment
            .verify(scheme, self.number, keys, values, locator)?;
        let attributes = build_attributes(keys, values)?;

        let mut revealed = self.clone();
        revealed.attributes = attributes;
        revealed.content_locator = Some(locator.to_string());
        Ok(revealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provenance::digest;

    const LOCATOR: &str = "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=";

    fn minted(number: u64, keys: &[&str], values: &[&str]) -> AssetRecord {
        let commitment = digest(number, keys, values, LOCATOR).unwrap();
        let request = MintRequest::new("Ghost #1", "unrevealed", commitment)
            .external_url("https://example.com/1");
        AssetRecord::mint(CollectionId::from_bytes([0x01; 32]), number, request)
    }

    #[test]
    fn test_mint_starts_unrevealed() {
        let asset = minted(1, &["eyes"], &["red"]);
        assert_eq!(asset.number(), 1);
        assert_eq!(asset.external_url(), "https://example.com/1");
        assert!(asset.attributes().is_empty());
        assert!(asset.content_locator().is_none());
        assert!(!asset.is_revealed());
        assert_eq!(asset.id(), &AssetId::derive(asset.collection_id(), 1));
    }

    #[test]
    fn test_reveal_with_matching_content() {
        let asset = minted(7, &["eyes", "hat"], &["red", "cap"]);
        let revealed = asset
            .prepare_reveal(&CommitmentScheme::STANDARD, &["eyes", "hat"], &["red", "cap"], LOCATOR)
            .unwrap();

        assert!(revealed.is_revealed());
        assert_eq!(revealed.attributes()["hat"], "cap");
        assert_eq!(revealed.content_locator(), Some(LOCATOR));
        assert_eq!(revealed.provenance_commitment(), asset.provenance_commitment());
        assert!(!asset.is_revealed());
    }

    #[test]
    fn test_reveal_with_wrong_content() {
        let asset = minted(7, &["eyes"], &["red"]);
        let err = asset
            .prepare_reveal(&CommitmentScheme::STANDARD, &["eyes"], &["blue"], LOCATOR)
            .unwrap_err();
        assert!(matches!(err, CoreError::ProvenanceMismatch { .. }));
    }

    #[test]
    fn test_second_reveal_rejected() {
        let asset = minted(3, &["eyes"], &["red"]);
        let revealed = asset
            .prepare_reveal(&CommitmentScheme::STANDARD, &["eyes"], &["red"], LOCATOR)
            .unwrap();
        let err = revealed
            .prepare_reveal(&CommitmentScheme::STANDARD, &["eyes"], &["red"], LOCATOR)
            .unwrap_err();
        assert_eq!(err, CoreError::AlreadyRevealed(3));
    }

    #[test]
    fn test_duplicate_keys_fail_after_digest_matches() {
        let asset = minted(2, &["eyes", "eyes"], &["red", "blue"]);
        let err = asset
            .prepare_reveal(
                &CommitmentScheme::STANDARD,
                &["eyes", "eyes"],
                &["red", "blue"],
                LOCATOR,
            )
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateAttributeKey("eyes".into()));
    }

    #[test]
    fn test_content_id_after_reveal() {
        let asset = minted(1, &[], &[]);
        assert!(asset.content_id().is_none());
        let revealed = asset
            .prepare_reveal::<&str, &str>(&CommitmentScheme::STANDARD, &[], &[], LOCATOR)
            .unwrap();
        let id = revealed.content_id().unwrap().unwrap();
        assert_eq!(id.to_locator(), LOCATOR);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let asset = minted(5, &["eyes"], &["red"]);
        let json = serde_json::to_string(&asset).unwrap();
        let back: AssetRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
