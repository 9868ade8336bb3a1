//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a kernel with an in-memory gate
//! and a recording event sink, plus secret assets that know their own
//! commitment.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use unveil::{
    AssetRecord, CollectionHandle, ContentId, Kernel, KernelConfig, MemoryContentGate,
    MintRequest, ProvenanceCommitment, RecordingSink,
};
use unveil_core::CommitmentScheme;
use unveil_store::{MemoryStore, SqliteStore, Store};

/// The trait keys every generated secret carries, in commitment order.
pub const TRAIT_KEYS: [&str; 4] = ["background", "eyes", "mouth", "skin"];

const TRAIT_CHOICES: [&[&str]; 4] = [
    &["blue", "green", "orange", "purple"],
    &["closed", "laser", "wink"],
    &["grin", "pipe", "smile"],
    &["gold", "silver", "zombie"],
];

/// Reveal content held back until reveal time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretAsset {
    pub number: u64,
    pub keys: Vec<String>,
    pub values: Vec<String>,
    pub content: ContentId,
}

impl SecretAsset {
    pub fn new(number: u64, traits: &[(&str, &str)], content: ContentId) -> Self {
        Self {
            number,
            keys: traits.iter().map(|(k, _)| k.to_string()).collect(),
            values: traits.iter().map(|(_, v)| v.to_string()).collect(),
            content,
        }
    }

    /// Random trait values and content id for the given sequence number.
    pub fn random(number: u64) -> Self {
        let mut rng = rand::thread_rng();
        let values = TRAIT_CHOICES
            .iter()
            .map(|choices| choices[rng.gen_range(0..choices.len())].to_string())
            .collect();

        Self {
            number,
            keys: TRAIT_KEYS.iter().map(|k| k.to_string()).collect(),
            values,
            content: ContentId::from_le_bytes(rng.gen()),
        }
    }

    /// The locator the reveal will carry.
    pub fn locator(&self) -> String {
        self.content.to_locator()
    }

    /// The commitment to publish at mint time.
    pub fn commitment(&self, scheme: &CommitmentScheme) -> unveil_core::Result<ProvenanceCommitment> {
        ProvenanceCommitment::compute(scheme, self.number, &self.keys, &self.values, &self.locator())
    }

    /// A mint request carrying this secret's commitment.
    pub fn request(&self, scheme: &CommitmentScheme) -> unveil_core::Result<MintRequest> {
        Ok(MintRequest::new(
            format!("Unrevealed #{}", self.number),
            "Revealed after the sale",
            self.commitment(scheme)?,
        ))
    }
}

/// A kernel wired to an in-memory gate and a recording sink.
pub struct TestFixture<S: Store = MemoryStore> {
    pub kernel: Kernel<S, MemoryContentGate>,
    pub events: Arc<RecordingSink>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture backed by an in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), KernelConfig::default())
    }

    /// Create a fixture with a custom configuration.
    pub fn with_config(config: KernelConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl TestFixture<SqliteStore> {
    /// Create a fixture backed by a SQLite database at `path`.
    pub fn sqlite(path: impl AsRef<Path>) -> unveil::Result<Self> {
        let store = SqliteStore::open(path)?;
        Ok(Self::with_store(store, KernelConfig::default()))
    }
}

impl<S: Store> TestFixture<S> {
    pub fn with_store(store: S, config: KernelConfig) -> Self {
        let events = Arc::new(RecordingSink::new());
        let kernel =
            Kernel::new(store, MemoryContentGate::new(), config).with_sink(events.clone());
        Self { kernel, events }
    }

    fn scheme(&self) -> &CommitmentScheme {
        &self.kernel.config().scheme
    }

    /// Make a secret's content visible to the gate.
    pub fn publish(&self, secret: &SecretAsset) {
        self.kernel.gate().publish(secret.content);
    }

    /// Mint one asset committing to `secret`.
    pub async fn mint_secret(
        &self,
        handle: &CollectionHandle,
        secret: &SecretAsset,
    ) -> unveil::Result<AssetRecord> {
        let request = secret.request(self.scheme())?;
        self.kernel.mint(&handle.mint_cap, request).await
    }

    /// Publish and reveal a previously minted secret.
    pub async fn reveal_secret(
        &self,
        handle: &CollectionHandle,
        secret: &SecretAsset,
    ) -> unveil::Result<AssetRecord> {
        self.publish(secret);
        let asset_id = self.kernel.lookup(&handle.collection_id, secret.number).await?;
        self.kernel
            .reveal(
                &handle.reveal_cap,
                &asset_id,
                &secret.keys,
                &secret.values,
                &secret.locator(),
            )
            .await
    }

    /// Create a collection and mint its whole supply from random secrets.
    pub async fn minted_collection(
        &self,
        supply: u64,
    ) -> unveil::Result<(CollectionHandle, Vec<SecretAsset>)> {
        let handle = self.kernel.create_collection(supply).await?;
        let mut secrets = Vec::with_capacity(supply as usize);
        for number in 1..=supply {
            let secret = SecretAsset::random(number);
            self.mint_secret(&handle, &secret).await?;
            secrets.push(secret);
        }
        Ok((handle, secrets))
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unveil::{AssetEvent, CoreError};

    #[test]
    fn test_secret_commitment_deterministic() {
        let secret = SecretAsset::random(7);
        let scheme = CommitmentScheme::STANDARD;
        assert_eq!(
            secret.commitment(&scheme).unwrap(),
            secret.commitment(&scheme).unwrap()
        );
        assert_eq!(secret.keys.len(), secret.values.len());
    }

    #[tokio::test]
    async fn test_fixture_full_collection() {
        let fixture = TestFixture::new();
        let (handle, secrets) = fixture.minted_collection(3).await.unwrap();

        for secret in &secrets {
            let asset = fixture.reveal_secret(&handle, secret).await.unwrap();
            assert_eq!(asset.content_locator(), Some(secret.locator().as_str()));
        }

        fixture
            .kernel
            .destroy_reveal_authority(handle.reveal_cap)
            .await
            .unwrap();

        let events = fixture.events.take();
        let revealed = events
            .iter()
            .filter(|e| matches!(e, AssetEvent::Revealed { .. }))
            .count();
        assert_eq!(revealed, 3);
        assert_eq!(events.len(), 3 + 3 + 1);
    }

    #[tokio::test]
    async fn test_fixture_reveal_without_publish() {
        let fixture = TestFixture::new();
        let (handle, secrets) = fixture.minted_collection(1).await.unwrap();
        let asset_id = fixture.kernel.lookup(&handle.collection_id, 1).await.unwrap();

        let err = fixture
            .kernel
            .reveal(
                &handle.reveal_cap,
                &asset_id,
                &secrets[0].keys,
                &secrets[0].values,
                &secrets[0].locator(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::ContentNotFound(_))));
    }

    #[tokio::test]
    async fn test_sqlite_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = TestFixture::sqlite(dir.path().join("fixture.db")).unwrap();
        let (handle, secrets) = fixture.minted_collection(2).await.unwrap();

        fixture.reveal_secret(&handle, &secrets[1]).await.unwrap();
        assert_eq!(fixture.kernel.revealed(&handle.collection_id).await.unwrap(), 1);
        assert_eq!(fixture.kernel.minted(&handle.collection_id).await.unwrap(), 2);
    }
}
