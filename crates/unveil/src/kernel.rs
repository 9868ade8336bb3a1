//! The Kernel: unified API for Unveil.
//!
//! The Kernel brings together storage, the content gate and event delivery
//! into the operations a host calls: bootstrap a collection, mint into it,
//! reveal its assets, and destroy its authorities once they are spent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use unveil_core::canonical::check_pair_lengths;
use unveil_core::validation::{check_bulk_lengths, check_bulk_limit};
use unveil_core::{
    AssetEvent, AssetId, AssetRecord, AuthorityKind, CapacityAuthority, Capability,
    CapabilityKind, CollectionId, CommitmentScheme, ContentId, CoreError, MintCap, MintRequest,
    ProvenanceCommitment, Retirement, RevealCap,
};
use unveil_store::{AuthorityRecord, InsertResult, Store, StoreError, StoreExt};

use crate::error::{DestroyRefused, KernelError, Result};
use crate::events::{EventSink, TracingSink};
use crate::gate::ContentGate;

/// Default upper bound on a single bulk mint.
pub const DEFAULT_MAX_BULK_MINT: usize = 1000;

/// Configuration for the Kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Canonical encoding used for commitments. Fixed for a deployment.
    pub scheme: CommitmentScheme,
    /// Largest batch `bulk_mint` accepts.
    pub max_bulk_mint: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheme: CommitmentScheme::STANDARD,
            max_bulk_mint: DEFAULT_MAX_BULK_MINT,
        }
    }
}

impl KernelConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))
    }
}

/// The capabilities issued when a collection is bootstrapped.
///
/// This is the only place capabilities come from. Whoever holds them controls
/// the collection.
#[derive(Debug)]
pub struct CollectionHandle {
    pub collection_id: CollectionId,
    pub mint_cap: MintCap,
    pub reveal_cap: RevealCap,
}

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Bootstrapping collections and issuing their capabilities
/// - Minting assets against a provenance commitment
/// - Revealing assets with content that matches the commitment
/// - Querying assets and counters
/// - Destroying spent authorities
pub struct Kernel<S: Store, G: ContentGate> {
    /// The storage backend.
    store: Arc<S>,
    /// Existence check for revealed content.
    gate: Arc<G>,
    /// Configuration.
    config: KernelConfig,
    /// Where committed events go.
    sink: Box<dyn EventSink>,
    /// One async lock per collection, held for each read-then-write operation.
    locks: LockMap,
}

impl<S: Store, G: ContentGate> Kernel<S, G> {
    /// Create a new kernel instance that logs events through `tracing`.
    pub fn new(store: S, gate: G, config: KernelConfig) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(gate), config)
    }

    /// Create a kernel over a store and gate the host also holds.
    pub fn from_shared(store: Arc<S>, gate: Arc<G>, config: KernelConfig) -> Self {
        Self {
            store,
            gate,
            config,
            sink: Box::new(TracingSink),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the content gate reference.
    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a collection with a random id.
    pub async fn create_collection(&self, target_supply: u64) -> Result<CollectionHandle> {
        self.bootstrap(CollectionId::generate(), target_supply).await
    }

    /// Create the mint and reveal authorities of a host-supplied collection.
    ///
    /// Both authorities get `target_supply` as their target. Fails with
    /// `AlreadyInitialized` if the collection was ever bootstrapped, even if
    /// its authorities have since been destroyed.
    pub async fn bootstrap(
        &self,
        collection_id: CollectionId,
        target_supply: u64,
    ) -> Result<CollectionHandle> {
        let _guard = self.lock_collection(&collection_id).await;

        let mint_cap = MintCap::issue(collection_id);
        let reveal_cap = RevealCap::issue(collection_id);
        let records = [
            AuthorityRecord::new(
                CapacityAuthority::new(collection_id, AuthorityKind::Mint, target_supply),
                mint_cap.fingerprint(),
            ),
            AuthorityRecord::new(
                CapacityAuthority::new(collection_id, AuthorityKind::Reveal, target_supply),
                reveal_cap.fingerprint(),
            ),
        ];

        match self.store.insert_authorities(&records).await? {
            InsertResult::Inserted => {}
            InsertResult::AlreadyExists => {
                return Err(CoreError::AlreadyInitialized(collection_id.to_string()).into());
            }
        }

        tracing::debug!(collection = %collection_id, target_supply, "collection bootstrapped");
        Ok(CollectionHandle {
            collection_id,
            mint_cap,
            reveal_cap,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mint Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint one asset.
    ///
    /// The asset gets the next sequence number and carries the request's
    /// commitment verbatim. Reveal fields start empty.
    pub async fn mint(&self, cap: &MintCap, request: MintRequest) -> Result<AssetRecord> {
        let collection_id = *cap.collection_id();
        let _guard = self.lock_collection(&collection_id).await;

        let record = self.live_authority(cap, &collection_id).await?;
        let mut authority = record.authority;
        let expected = authority.size();
        let number = authority.admit()?;

        let asset = AssetRecord::mint(collection_id, number, request);
        self.store
            .commit_mint(&authority, expected, std::slice::from_ref(&asset))
            .await
            .map_err(|e| log_conflict(e, &collection_id))?;

        tracing::debug!(collection = %collection_id, number, "asset minted");
        self.emit_created(&asset);
        Ok(asset)
    }

    /// Mint one asset per element of three parallel arrays.
    ///
    /// All of them are minted or none is. Numbers ascend in input order.
    pub async fn bulk_mint<N, D>(
        &self,
        cap: &MintCap,
        names: &[N],
        descriptions: &[D],
        provenance_commitments: &[ProvenanceCommitment],
    ) -> Result<Vec<AssetRecord>>
    where
        N: AsRef<str>,
        D: AsRef<str>,
    {
        check_bulk_lengths(names.len(), descriptions.len(), provenance_commitments.len())?;
        check_bulk_limit(names.len(), self.config.max_bulk_mint)?;

        let collection_id = *cap.collection_id();
        let _guard = self.lock_collection(&collection_id).await;

        let record = self.live_authority(cap, &collection_id).await?;
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut authority = record.authority;
        let expected = authority.size();
        let numbers = authority.admit_many(names.len() as u64)?;

        let assets: Vec<AssetRecord> = numbers
            .zip(names.iter().zip(descriptions).zip(provenance_commitments))
            .map(|(number, ((name, description), commitment))| {
                AssetRecord::mint(
                    collection_id,
                    number,
                    MintRequest::new(name.as_ref(), description.as_ref(), commitment.clone()),
                )
            })
            .collect();

        self.store
            .commit_mint(&authority, expected, &assets)
            .await
            .map_err(|e| log_conflict(e, &collection_id))?;

        tracing::debug!(
            collection = %collection_id,
            count = assets.len(),
            minted = authority.size(),
            "bulk mint committed"
        );
        for asset in &assets {
            self.emit_created(asset);
        }
        Ok(assets)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reveal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Reveal an asset's attributes and content locator.
    ///
    /// The content must be published behind the gate and must hash to the
    /// asset's commitment under the configured scheme. Nothing changes unless
    /// every check passes.
    pub async fn reveal<K, V>(
        &self,
        cap: &RevealCap,
        asset_id: &AssetId,
        keys: &[K],
        values: &[V],
        locator: &str,
    ) -> Result<AssetRecord>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let collection_id = *self.load_asset(asset_id).await?.collection_id();
        let _guard = self.lock_collection(&collection_id).await;

        // Reload under the lock; the copy read above may be stale.
        let asset = self.load_asset(asset_id).await?;
        let record = self.live_authority(cap, &collection_id).await?;
        asset.ensure_unrevealed()?;
        check_pair_lengths(keys.len(), values.len())?;

        let content_id = ContentId::from_locator(locator)?;
        if !self.gate.exists(&content_id).await? {
            tracing::warn!(collection = %collection_id, number = asset.number(), locator, "reveal content not published");
            return Err(CoreError::ContentNotFound(locator.to_string()).into());
        }

        let revealed = asset
            .prepare_reveal(&self.config.scheme, keys, values, locator)
            .map_err(|e| {
                tracing::warn!(collection = %collection_id, number = asset.number(), error = %e, "reveal rejected");
                e
            })?;

        let mut authority = record.authority;
        let expected = authority.size();
        authority.admit()?;

        self.store
            .commit_reveal(&authority, expected, &revealed)
            .await
            .map_err(|e| log_conflict(e, &collection_id))?;

        tracing::debug!(
            collection = %collection_id,
            number = revealed.number(),
            revealed = authority.size(),
            "asset revealed"
        );
        self.sink.emit(&AssetEvent::Revealed {
            collection_id,
            asset_id: *revealed.id(),
        });
        Ok(revealed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Destroy Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Destroy the mint authority once the full supply is minted.
    pub async fn destroy_mint_authority(
        &self,
        cap: MintCap,
    ) -> std::result::Result<Retirement, DestroyRefused<unveil_core::MintRight>> {
        self.destroy(cap).await
    }

    /// Destroy the reveal authority once every asset is revealed.
    pub async fn destroy_reveal_authority(
        &self,
        cap: RevealCap,
    ) -> std::result::Result<Retirement, DestroyRefused<unveil_core::RevealRight>> {
        self.destroy(cap).await
    }

    async fn destroy<K: CapabilityKind>(
        &self,
        cap: Capability<K>,
    ) -> std::result::Result<Retirement, DestroyRefused<K>> {
        match self.try_destroy(&cap).await {
            Ok(retirement) => Ok(retirement),
            Err(error) => Err(DestroyRefused {
                error,
                capability: cap,
            }),
        }
    }

    async fn try_destroy<K: CapabilityKind>(&self, cap: &Capability<K>) -> Result<Retirement> {
        let collection_id = *cap.collection_id();
        let _guard = self.lock_collection(&collection_id).await;

        let record = self.live_authority(cap, &collection_id).await?;
        let retirement = record.authority.destroy()?;
        self.store
            .retire_authority(&collection_id, K::KIND, retirement.count)
            .await
            .map_err(|e| log_conflict(e, &collection_id))?;

        tracing::debug!(collection = %collection_id, kind = %K::KIND, count = retirement.count, "authority destroyed");
        self.sink.emit(&AssetEvent::AuthorityDestroyed {
            collection_id,
            kind: K::KIND,
        });
        Ok(retirement)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a sequence number to the asset minted at it.
    pub async fn lookup(&self, collection_id: &CollectionId, number: u64) -> Result<AssetId> {
        self.store
            .lookup(collection_id, number)
            .await?
            .ok_or_else(|| CoreError::LookupMiss(number).into())
    }

    /// Current count of the authority a capability unlocks.
    pub async fn size<K: CapabilityKind>(&self, cap: &Capability<K>) -> Result<u64> {
        let collection_id = cap.collection_id();
        let record = self
            .store
            .get_authority(collection_id, K::KIND)
            .await?
            .ok_or(KernelError::CollectionNotFound(*collection_id))?;
        cap.authorize(collection_id, &record.cap_fingerprint)?;
        Ok(record.authority.size())
    }

    /// Number of assets minted in a collection.
    pub async fn minted(&self, collection_id: &CollectionId) -> Result<u64> {
        self.counter(collection_id, AuthorityKind::Mint).await
    }

    /// Number of assets revealed in a collection.
    pub async fn revealed(&self, collection_id: &CollectionId) -> Result<u64> {
        self.counter(collection_id, AuthorityKind::Reveal).await
    }

    /// Get an asset by ID.
    pub async fn asset(&self, asset_id: &AssetId) -> Result<Option<AssetRecord>> {
        Ok(self.store.get_asset(asset_id).await?)
    }

    /// Assets with `start <= number <= end`, ordered by number.
    pub async fn assets(
        &self,
        collection_id: &CollectionId,
        start: u64,
        end: u64,
    ) -> Result<Vec<AssetRecord>> {
        Ok(self.store.get_assets_range(collection_id, start, end).await?)
    }

    /// Every asset minted so far in a collection.
    pub async fn all_assets(&self, collection_id: &CollectionId) -> Result<Vec<AssetRecord>> {
        Ok(self.store.all_assets(collection_id).await?)
    }

    /// List all known collections.
    pub async fn collections(&self) -> Result<Vec<CollectionId>> {
        Ok(self.store.list_collections().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize with every other operation on the same collection.
    ///
    /// The map entry lives only while some operation holds or waits on it.
    async fn lock_collection(&self, collection_id: &CollectionId) -> CollectionGuard<'_> {
        let lock = {
            // The map only hands out Arcs, so a poisoned guard leaves it consistent.
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(*collection_id).or_default().clone()
        };
        CollectionGuard {
            locks: &self.locks,
            collection_id: *collection_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Load the authority a capability unlocks and check that it may act.
    async fn live_authority<K: CapabilityKind>(
        &self,
        cap: &Capability<K>,
        target: &CollectionId,
    ) -> Result<AuthorityRecord> {
        let record = self
            .store
            .get_authority(target, K::KIND)
            .await?
            .ok_or(KernelError::CollectionNotFound(*target))?;

        cap.authorize(target, &record.cap_fingerprint)?;
        if record.retired {
            return Err(CoreError::AuthorityRetired(K::KIND).into());
        }
        Ok(record)
    }

    async fn load_asset(&self, asset_id: &AssetId) -> Result<AssetRecord> {
        self.store
            .get_asset(asset_id)
            .await?
            .ok_or(KernelError::AssetNotFound(*asset_id))
    }

    async fn counter(&self, collection_id: &CollectionId, kind: AuthorityKind) -> Result<u64> {
        let record = self
            .store
            .get_authority(collection_id, kind)
            .await?
            .ok_or(KernelError::CollectionNotFound(*collection_id))?;
        Ok(record.authority.size())
    }

    fn emit_created(&self, asset: &AssetRecord) {
        self.sink.emit(&AssetEvent::Created {
            collection_id: *asset.collection_id(),
            asset_id: *asset.id(),
            number: asset.number(),
            provenance_commitment: asset.provenance_commitment().clone(),
        });
    }
}

type LockMap = Mutex<HashMap<CollectionId, Arc<AsyncMutex<()>>>>;

/// Held for the duration of one collection operation.
struct CollectionGuard<'a> {
    locks: &'a LockMap,
    collection_id: CollectionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CollectionGuard<'_> {
    fn drop(&mut self) {
        // Release first so the guard's own Arc is not counted.
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&self.collection_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.collection_id);
            }
        }
    }
}

fn log_conflict(error: StoreError, collection_id: &CollectionId) -> KernelError {
    if let StoreError::Conflict { detail, .. } = &error {
        tracing::warn!(collection = %collection_id, detail = %detail, "commit lost a concurrent update");
    }
    error.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::gate::MemoryContentGate;
    use unveil_core::digest;
    use unveil_store::MemoryStore;

    const LOCATOR: &str = "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=";

    fn kernel() -> Kernel<MemoryStore, MemoryContentGate> {
        let gate = MemoryContentGate::new();
        gate.publish(ContentId::from_locator(LOCATOR).unwrap());
        Kernel::new(MemoryStore::new(), gate, KernelConfig::default())
    }

    fn request(number: u64) -> MintRequest {
        let commitment = digest(number, &["eyes"], &["red"], LOCATOR).unwrap();
        MintRequest::new(format!("Hidden #{}", number), "unrevealed", commitment)
    }

    #[test]
    fn test_config_from_json() {
        let config = KernelConfig::from_json(
            r#"{"scheme": {"number": "raw_le64", "pairs": "keys_then_values"}}"#,
        )
        .unwrap();
        assert_eq!(config.max_bulk_mint, DEFAULT_MAX_BULK_MINT);
        assert_ne!(config.scheme, CommitmentScheme::STANDARD);

        assert_eq!(KernelConfig::from_json("{}").unwrap(), KernelConfig::default());
        assert!(matches!(
            KernelConfig::from_json("{\"max_bulk_mint\": -1}"),
            Err(KernelError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_mint_then_reveal() {
        let sink = Arc::new(RecordingSink::new());
        let kernel = kernel().with_sink(sink.clone());
        let handle = kernel.create_collection(2).await.unwrap();

        let asset = kernel.mint(&handle.mint_cap, request(1)).await.unwrap();
        assert_eq!(asset.number(), 1);
        assert_eq!(kernel.size(&handle.mint_cap).await.unwrap(), 1);

        let revealed = kernel
            .reveal(&handle.reveal_cap, asset.id(), &["eyes"], &["red"], LOCATOR)
            .await
            .unwrap();
        assert_eq!(revealed.attributes()["eyes"], "red");
        assert_eq!(kernel.revealed(&handle.collection_id).await.unwrap(), 1);

        let names: Vec<_> = sink.events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["asset_created", "asset_revealed"]);
    }

    #[tokio::test]
    async fn test_bootstrap_twice_fails() {
        let kernel = kernel();
        let collection_id = CollectionId::generate();
        kernel.bootstrap(collection_id, 3).await.unwrap();

        let err = kernel.bootstrap(collection_id, 3).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::AlreadyInitialized(_))));
    }

    #[tokio::test]
    async fn test_foreign_capability_rejected() {
        let kernel = kernel();
        let ours = kernel.create_collection(1).await.unwrap();
        let theirs = kernel.create_collection(1).await.unwrap();

        let asset = kernel.mint(&ours.mint_cap, request(1)).await.unwrap();
        let err = kernel
            .reveal(&theirs.reveal_cap, asset.id(), &["eyes"], &["red"], LOCATOR)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::CollectionMismatch { .. })));

        let forged = MintCap::from_parts(ours.collection_id, [0u8; 32]);
        let err = kernel.mint(&forged, request(2)).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Unauthorized(AuthorityKind::Mint))));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let kernel = kernel();
        let cap = MintCap::issue(CollectionId::generate());
        let err = kernel.mint(&cap, request(1)).await.unwrap_err();
        assert!(matches!(err, KernelError::CollectionNotFound(_)));
    }

    fn lock_count<S: Store, G: ContentGate>(kernel: &Kernel<S, G>) -> usize {
        kernel.locks.lock().unwrap().len()
    }

    #[tokio::test]
    async fn test_rejected_operations_leave_no_locks() {
        let kernel = kernel();
        for _ in 0..200 {
            let cap = MintCap::issue(CollectionId::generate());
            let err = kernel.mint(&cap, request(1)).await.unwrap_err();
            assert!(matches!(err, KernelError::CollectionNotFound(_)));
        }
        assert_eq!(lock_count(&kernel), 0);

        let handle = kernel.create_collection(1).await.unwrap();
        kernel.mint(&handle.mint_cap, request(1)).await.unwrap();
        kernel.mint(&handle.mint_cap, request(2)).await.unwrap_err();
        kernel.destroy_mint_authority(handle.mint_cap).await.unwrap();
        assert_eq!(lock_count(&kernel), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_operations_release_locks() {
        let kernel = Arc::new(kernel());
        let handle = kernel.create_collection(16).await.unwrap();
        let cap = Arc::new(handle.mint_cap);

        let tasks: Vec<_> = (1..=16)
            .map(|number| {
                let kernel = Arc::clone(&kernel);
                let cap = Arc::clone(&cap);
                tokio::spawn(async move { kernel.mint(&cap, request(number)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(kernel.minted(&handle.collection_id).await.unwrap(), 16);
        assert_eq!(lock_count(&kernel), 0);
    }
}
