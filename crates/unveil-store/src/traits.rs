//! Store trait: the abstract interface for authority and asset persistence.
//!
//! This trait allows the kernel to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use unveil_core::{
    AssetId, AssetRecord, AuthorityKind, Blake3Hash, CapacityAuthority, CollectionId,
};

use crate::error::{Result, StoreError};

/// Result of inserting authority records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Records were inserted.
    Inserted,
    /// An authority already exists for this collection (live or retired).
    AlreadyExists,
}

/// A persisted capacity authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityRecord {
    /// Counter, target and phase.
    pub authority: CapacityAuthority,
    /// Fingerprint of the capability that unlocks this authority.
    pub cap_fingerprint: Blake3Hash,
    /// Set once the authority is destroyed. Never cleared.
    pub retired: bool,
}

impl AuthorityRecord {
    /// A fresh, live record.
    pub fn new(authority: CapacityAuthority, cap_fingerprint: Blake3Hash) -> Self {
        Self {
            authority,
            cap_fingerprint,
            retired: false,
        }
    }

    pub fn collection_id(&self) -> &CollectionId {
        self.authority.collection_id()
    }

    pub fn kind(&self) -> AuthorityKind {
        self.authority.kind()
    }
}

/// The Store trait: async interface for persistence.
///
/// # Design Notes
///
/// - **Atomic commits**: `commit_mint` and `commit_reveal` write the authority
///   counter and the asset records in one unit. Either all of it lands or
///   none of it does.
/// - **Compare-and-swap**: every commit names the counter value it was computed
///   from. If the stored counter differs, the commit fails with
///   `StoreError::Conflict` and nothing is written.
/// - **Retirement is permanent**: a retired authority rejects every commit and
///   its record is kept so the collection can never be bootstrapped again.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Authority Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert the authorities of a new collection, all or none.
    ///
    /// Returns `AlreadyExists` if any of them is already on record.
    async fn insert_authorities(&self, records: &[AuthorityRecord]) -> Result<InsertResult>;

    /// Get an authority record.
    async fn get_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
    ) -> Result<Option<AuthorityRecord>>;

    /// Mark an authority retired, provided its counter still reads
    /// `expected_count`.
    async fn retire_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
        expected_count: u64,
    ) -> Result<()>;

    /// List the collections that have authorities on record.
    async fn list_collections(&self) -> Result<Vec<CollectionId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Commit Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a mint: the advanced mint authority, the new assets, and their
    /// number index entries.
    async fn commit_mint(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        assets: &[AssetRecord],
    ) -> Result<()>;

    /// Persist a reveal: the advanced reveal authority and the revealed asset.
    ///
    /// Fails with a conflict if the stored asset is already revealed.
    async fn commit_reveal(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        asset: &AssetRecord,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Asset Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an asset by id.
    async fn get_asset(&self, id: &AssetId) -> Result<Option<AssetRecord>>;

    /// Resolve a sequence number to an asset id.
    async fn lookup(&self, collection_id: &CollectionId, number: u64) -> Result<Option<AssetId>>;

    /// Get assets with `start <= number <= end`, ordered by number.
    async fn get_assets_range(
        &self,
        collection_id: &CollectionId,
        start: u64,
        end: u64,
    ) -> Result<Vec<AssetRecord>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Every asset minted so far in a collection, ordered by number.
    fn all_assets(
        &self,
        collection_id: &CollectionId,
    ) -> impl std::future::Future<Output = Result<Vec<AssetRecord>>> + Send;

    /// Both counters of a collection as `(minted, revealed)`.
    fn counters(
        &self,
        collection_id: &CollectionId,
    ) -> impl std::future::Future<Output = Result<Option<(u64, u64)>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn all_assets(&self, collection_id: &CollectionId) -> Result<Vec<AssetRecord>> {
        let minted = match self.get_authority(collection_id, AuthorityKind::Mint).await? {
            Some(record) => record.authority.size(),
            None => return Ok(Vec::new()),
        };
        if minted == 0 {
            return Ok(Vec::new());
        }
        self.get_assets_range(collection_id, 1, minted).await
    }

    async fn counters(&self, collection_id: &CollectionId) -> Result<Option<(u64, u64)>> {
        let mint = self.get_authority(collection_id, AuthorityKind::Mint).await?;
        let reveal = self.get_authority(collection_id, AuthorityKind::Reveal).await?;
        Ok(match (mint, reveal) {
            (Some(m), Some(r)) => Some((m.authority.size(), r.authority.size())),
            _ => None,
        })
    }
}

/// Check a counter advance against the stored authority.
///
/// Shared by every backend so they reject exactly the same commits.
pub(crate) fn check_advance(
    stored: &AuthorityRecord,
    authority: &CapacityAuthority,
    expected_count: u64,
    admitted: u64,
) -> Result<()> {
    let collection_id = authority.collection_id();
    if stored.retired {
        return Err(StoreError::conflict(
            collection_id,
            format!("{} authority is retired", authority.kind()),
        ));
    }
    if stored.authority.size() != expected_count {
        return Err(StoreError::conflict(
            collection_id,
            format!(
                "{} count is {}, expected {}",
                authority.kind(),
                stored.authority.size(),
                expected_count
            ),
        ));
    }
    if stored.authority.target() != authority.target()
        || expected_count.checked_add(admitted) != Some(authority.size())
    {
        return Err(StoreError::InvalidData(format!(
            "{} authority advance from {} by {} does not reach {}",
            authority.kind(),
            expected_count,
            admitted,
            authority.size()
        )));
    }
    Ok(())
}
