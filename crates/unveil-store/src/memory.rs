//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use unveil_core::{AssetId, AssetRecord, AuthorityKind, CapacityAuthority, CollectionId};

use crate::error::{Result, StoreError};
use crate::traits::{check_advance, AuthorityRecord, InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Authorities indexed by collection and kind.
    authorities: HashMap<(CollectionId, AuthorityKind), AuthorityRecord>,

    /// Assets indexed by ID.
    assets: HashMap<AssetId, AssetRecord>,

    /// Number index: (collection_id, number) -> asset_id.
    positions: BTreeMap<(CollectionId, u64), AssetId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn stored_authority(&self, authority: &CapacityAuthority) -> Result<&AuthorityRecord> {
        self.authorities
            .get(&(*authority.collection_id(), authority.kind()))
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "{} authority for {}",
                    authority.kind(),
                    authority.collection_id()
                ))
            })
    }

    fn set_authority(&mut self, authority: &CapacityAuthority) {
        if let Some(record) = self
            .authorities
            .get_mut(&(*authority.collection_id(), authority.kind()))
        {
            record.authority = authority.clone();
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_authorities(&self, records: &[AuthorityRecord]) -> Result<InsertResult> {
        let mut inner = self.write()?;

        let mut seen = BTreeSet::new();
        for record in records {
            let key = (*record.collection_id(), record.kind());
            if inner.authorities.contains_key(&key) || !seen.insert(key) {
                return Ok(InsertResult::AlreadyExists);
            }
        }

        for record in records {
            inner
                .authorities
                .insert((*record.collection_id(), record.kind()), record.clone());
        }

        Ok(InsertResult::Inserted)
    }

    async fn get_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
    ) -> Result<Option<AuthorityRecord>> {
        let inner = self.read()?;
        Ok(inner.authorities.get(&(*collection_id, kind)).cloned())
    }

    async fn retire_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
        expected_count: u64,
    ) -> Result<()> {
        let mut inner = self.write()?;

        let record = inner
            .authorities
            .get_mut(&(*collection_id, kind))
            .ok_or_else(|| StoreError::NotFound(format!("{} authority for {}", kind, collection_id)))?;

        if record.retired {
            return Err(StoreError::conflict(
                collection_id,
                format!("{} authority is already retired", kind),
            ));
        }
        if record.authority.size() != expected_count {
            return Err(StoreError::conflict(
                collection_id,
                format!(
                    "{} count is {}, expected {}",
                    kind,
                    record.authority.size(),
                    expected_count
                ),
            ));
        }

        record.retired = true;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionId>> {
        let inner = self.read()?;
        let collections: BTreeSet<CollectionId> =
            inner.authorities.keys().map(|(c, _)| *c).collect();
        Ok(collections.into_iter().collect())
    }

    async fn commit_mint(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        assets: &[AssetRecord],
    ) -> Result<()> {
        let mut inner = self.write()?;

        let stored = inner.stored_authority(authority)?;
        check_advance(stored, authority, expected_count, assets.len() as u64)?;

        let collection_id = *authority.collection_id();
        for asset in assets {
            if asset.collection_id() != &collection_id {
                return Err(StoreError::InvalidData(format!(
                    "asset {} belongs to another collection",
                    asset.number()
                )));
            }
            if inner.positions.contains_key(&(collection_id, asset.number()))
                || inner.assets.contains_key(asset.id())
            {
                return Err(StoreError::conflict(
                    &collection_id,
                    format!("asset {} already exists", asset.number()),
                ));
            }
        }

        inner.set_authority(authority);
        for asset in assets {
            inner
                .positions
                .insert((collection_id, asset.number()), *asset.id());
            inner.assets.insert(*asset.id(), asset.clone());
        }

        Ok(())
    }

    async fn commit_reveal(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        asset: &AssetRecord,
    ) -> Result<()> {
        let mut inner = self.write()?;

        let stored = inner.stored_authority(authority)?;
        check_advance(stored, authority, expected_count, 1)?;

        let collection_id = authority.collection_id();
        match inner.assets.get(asset.id()) {
            None => {
                return Err(StoreError::NotFound(format!("asset {}", asset.id())));
            }
            Some(existing) if existing.is_revealed() => {
                return Err(StoreError::conflict(
                    collection_id,
                    format!("asset {} is already revealed", existing.number()),
                ));
            }
            Some(_) => {}
        }

        inner.set_authority(authority);
        inner.assets.insert(*asset.id(), asset.clone());

        Ok(())
    }

    async fn get_asset(&self, id: &AssetId) -> Result<Option<AssetRecord>> {
        let inner = self.read()?;
        Ok(inner.assets.get(id).cloned())
    }

    async fn lookup(&self, collection_id: &CollectionId, number: u64) -> Result<Option<AssetId>> {
        let inner = self.read()?;
        Ok(inner.positions.get(&(*collection_id, number)).copied())
    }

    async fn get_assets_range(
        &self,
        collection_id: &CollectionId,
        start: u64,
        end: u64,
    ) -> Result<Vec<AssetRecord>> {
        let inner = self.read()?;
        if start > end {
            return Ok(Vec::new());
        }

        let assets = inner
            .positions
            .range((*collection_id, start)..=(*collection_id, end))
            .filter_map(|(_, id)| inner.assets.get(id).cloned())
            .collect();

        Ok(assets)
    }
}
