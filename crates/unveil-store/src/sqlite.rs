//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Unveil. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.
//!
//! Asset records are stored as CBOR blobs next to the columns the queries
//! filter on. Every commit runs in one immediate transaction, so the
//! compare-and-swap check and the writes it guards cannot interleave with
//! another writer.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use unveil_core::{
    AssetId, AssetRecord, AuthorityKind, Blake3Hash, CapacityAuthority, CollectionId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_advance, AuthorityRecord, InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn bytes32(bytes: Vec<u8>, column: &str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| StoreError::InvalidData(format!("{} has {} bytes", column, b.len())))
}

fn encode_record(record: &AssetRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_record(bytes: &[u8]) -> Result<AssetRecord> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn read_authority(
    conn: &Connection,
    collection_id: &CollectionId,
    kind: AuthorityKind,
) -> Result<Option<AuthorityRecord>> {
    let row: Option<(i64, i64, Vec<u8>, bool)> = conn
        .query_row(
            "SELECT count, target, cap_fingerprint, retired
             FROM authorities WHERE collection_id = ?1 AND kind = ?2",
            params![collection_id.as_bytes().as_slice(), kind.to_u8()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let Some((count, target, fingerprint, retired)) = row else {
        return Ok(None);
    };

    let authority = CapacityAuthority::restore(*collection_id, kind, count as u64, target as u64)
        .map_err(|e| StoreError::InvalidData(e.to_string()))?;

    Ok(Some(AuthorityRecord {
        authority,
        cap_fingerprint: Blake3Hash::from_bytes(bytes32(fingerprint, "cap_fingerprint")?),
        retired,
    }))
}

fn require_authority(conn: &Connection, authority: &CapacityAuthority) -> Result<AuthorityRecord> {
    read_authority(conn, authority.collection_id(), authority.kind())?.ok_or_else(|| {
        StoreError::NotFound(format!(
            "{} authority for {}",
            authority.kind(),
            authority.collection_id()
        ))
    })
}

fn write_count(conn: &Connection, authority: &CapacityAuthority) -> Result<()> {
    conn.execute(
        "UPDATE authorities SET count = ?3, updated_at = ?4
         WHERE collection_id = ?1 AND kind = ?2",
        params![
            authority.collection_id().as_bytes().as_slice(),
            authority.kind().to_u8(),
            authority.size() as i64,
            now_millis(),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_authorities(&self, records: &[AuthorityRecord]) -> Result<InsertResult> {
        let records = records.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = now_millis();

            for record in &records {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM authorities WHERE collection_id = ?1 AND kind = ?2)",
                    params![record.collection_id().as_bytes().as_slice(), record.kind().to_u8()],
                    |row| row.get(0),
                )?;
                if exists {
                    return Ok(InsertResult::AlreadyExists);
                }

                tx.execute(
                    "INSERT INTO authorities (
                        collection_id, kind, count, target, cap_fingerprint,
                        retired, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        record.collection_id().as_bytes().as_slice(),
                        record.kind().to_u8(),
                        record.authority.size() as i64,
                        record.authority.target() as i64,
                        record.cap_fingerprint.as_bytes().as_slice(),
                        record.retired,
                        now,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
    ) -> Result<Option<AuthorityRecord>> {
        let collection_id = *collection_id;
        self.run(move |conn| read_authority(conn, &collection_id, kind))
            .await
    }

    async fn retire_authority(
        &self,
        collection_id: &CollectionId,
        kind: AuthorityKind,
        expected_count: u64,
    ) -> Result<()> {
        let collection_id = *collection_id;

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let stored = read_authority(&tx, &collection_id, kind)?.ok_or_else(|| {
                StoreError::NotFound(format!("{} authority for {}", kind, collection_id))
            })?;
            if stored.retired {
                return Err(StoreError::conflict(
                    &collection_id,
                    format!("{} authority is already retired", kind),
                ));
            }
            if stored.authority.size() != expected_count {
                return Err(StoreError::conflict(
                    &collection_id,
                    format!(
                        "{} count is {}, expected {}",
                        kind,
                        stored.authority.size(),
                        expected_count
                    ),
                ));
            }

            tx.execute(
                "UPDATE authorities SET retired = 1, updated_at = ?3
                 WHERE collection_id = ?1 AND kind = ?2",
                params![collection_id.as_bytes().as_slice(), kind.to_u8(), now_millis()],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionId>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT collection_id FROM authorities ORDER BY collection_id",
            )?;
            let raw = stmt
                .query_map([], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            raw.into_iter()
                .map(|bytes| bytes32(bytes, "collection_id").map(CollectionId::from_bytes))
                .collect()
        })
        .await
    }

    async fn commit_mint(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        assets: &[AssetRecord],
    ) -> Result<()> {
        let authority = authority.clone();
        let assets = assets.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let stored = require_authority(&tx, &authority)?;
            check_advance(&stored, &authority, expected_count, assets.len() as u64)?;

            let collection_id = *authority.collection_id();
            let now = now_millis();
            for asset in &assets {
                if asset.collection_id() != &collection_id {
                    return Err(StoreError::InvalidData(format!(
                        "asset {} belongs to another collection",
                        asset.number()
                    )));
                }

                let taken: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM assets
                     WHERE asset_id = ?1 OR (collection_id = ?2 AND number = ?3))",
                    params![
                        asset.id().as_bytes().as_slice(),
                        collection_id.as_bytes().as_slice(),
                        asset.number() as i64,
                    ],
                    |row| row.get(0),
                )?;
                if taken {
                    return Err(StoreError::conflict(
                        &collection_id,
                        format!("asset {} already exists", asset.number()),
                    ));
                }

                tx.execute(
                    "INSERT INTO assets (
                        asset_id, collection_id, number, revealed, record,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
                    params![
                        asset.id().as_bytes().as_slice(),
                        collection_id.as_bytes().as_slice(),
                        asset.number() as i64,
                        encode_record(asset)?,
                        now,
                    ],
                )?;
            }

            write_count(&tx, &authority)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn commit_reveal(
        &self,
        authority: &CapacityAuthority,
        expected_count: u64,
        asset: &AssetRecord,
    ) -> Result<()> {
        let authority = authority.clone();
        let asset = asset.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let stored = require_authority(&tx, &authority)?;
            check_advance(&stored, &authority, expected_count, 1)?;

            let revealed: Option<bool> = tx
                .query_row(
                    "SELECT revealed FROM assets WHERE asset_id = ?1",
                    params![asset.id().as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            match revealed {
                None => return Err(StoreError::NotFound(format!("asset {}", asset.id()))),
                Some(true) => {
                    return Err(StoreError::conflict(
                        authority.collection_id(),
                        format!("asset {} is already revealed", asset.number()),
                    ))
                }
                Some(false) => {}
            }

            tx.execute(
                "UPDATE assets SET revealed = ?2, record = ?3, updated_at = ?4
                 WHERE asset_id = ?1",
                params![
                    asset.id().as_bytes().as_slice(),
                    asset.is_revealed(),
                    encode_record(&asset)?,
                    now_millis(),
                ],
            )?;

            write_count(&tx, &authority)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_asset(&self, id: &AssetId) -> Result<Option<AssetRecord>> {
        let id = *id;

        self.run(move |conn| {
            let record: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM assets WHERE asset_id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            record.map(|bytes| decode_record(&bytes)).transpose()
        })
        .await
    }

    async fn lookup(&self, collection_id: &CollectionId, number: u64) -> Result<Option<AssetId>> {
        let collection_id = *collection_id;

        self.run(move |conn| {
            let id: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT asset_id FROM assets WHERE collection_id = ?1 AND number = ?2",
                    params![collection_id.as_bytes().as_slice(), number as i64],
                    |row| row.get(0),
                )
                .optional()?;

            id.map(|bytes| bytes32(bytes, "asset_id").map(AssetId::from_bytes))
                .transpose()
        })
        .await
    }

    async fn get_assets_range(
        &self,
        collection_id: &CollectionId,
        start: u64,
        end: u64,
    ) -> Result<Vec<AssetRecord>> {
        let collection_id = *collection_id;
        if start > end {
            return Ok(Vec::new());
        }
        // Numbers are stored as i64; clamp so the comparison stays meaningful.
        let start = start.min(i64::MAX as u64) as i64;
        let end = end.min(i64::MAX as u64) as i64;

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record FROM assets
                 WHERE collection_id = ?1 AND number >= ?2 AND number <= ?3
                 ORDER BY number",
            )?;

            let blobs = stmt
                .query_map(
                    params![collection_id.as_bytes().as_slice(), start, end],
                    |row| row.get::<_, Vec<u8>>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            blobs.iter().map(|bytes| decode_record(bytes)).collect()
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unveil_core::{digest, CommitmentScheme, MintRequest};

    const LOCATOR: &str = "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=";

    async fn setup(store: &SqliteStore, target: u64) -> CollectionId {
        let collection_id = CollectionId::generate();
        let records = [AuthorityKind::Mint, AuthorityKind::Reveal].map(|kind| {
            AuthorityRecord::new(
                CapacityAuthority::new(collection_id, kind, target),
                Blake3Hash::hash(&[kind.to_u8()]),
            )
        });
        let result = store.insert_authorities(&records).await.unwrap();
        assert_eq!(result, InsertResult::Inserted);
        collection_id
    }

    fn make_asset(collection_id: CollectionId, number: u64) -> AssetRecord {
        let commitment = digest(number, &["eyes"], &["red"], LOCATOR).unwrap();
        AssetRecord::mint(
            collection_id,
            number,
            MintRequest::new(format!("Hidden #{}", number), "not yet", commitment),
        )
    }

    async fn mint_authority(store: &SqliteStore, collection_id: &CollectionId) -> CapacityAuthority {
        store
            .get_authority(collection_id, AuthorityKind::Mint)
            .await
            .unwrap()
            .unwrap()
            .authority
    }

    #[tokio::test]
    async fn test_insert_and_get_authority() {
        let store = SqliteStore::open_memory().unwrap();
        let collection_id = setup(&store, 10).await;

        let record = store
            .get_authority(&collection_id, AuthorityKind::Reveal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.authority.target(), 10);
        assert_eq!(record.authority.size(), 0);
        assert_eq!(record.cap_fingerprint, Blake3Hash::hash(&[1]));
        assert!(!record.retired);

        let again = store
            .insert_authorities(&[record.clone()])
            .await
            .unwrap();
        assert_eq!(again, InsertResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_bulk_commit_and_range() {
        let store = SqliteStore::open_memory().unwrap();
        let collection_id = setup(&store, 5).await;

        let mut authority = mint_authority(&store, &collection_id).await;
        let numbers = authority.admit_many(3).unwrap();
        let assets: Vec<_> = numbers.map(|n| make_asset(collection_id, n)).collect();
        store.commit_mint(&authority, 0, &assets).await.unwrap();

        let stored = store.get_assets_range(&collection_id, 1, 5).await.unwrap();
        assert_eq!(stored, assets);
        assert_eq!(mint_authority(&store, &collection_id).await.size(), 3);

        let id = store.lookup(&collection_id, 2).await.unwrap().unwrap();
        assert_eq!(&id, assets[1].id());
        assert!(store.lookup(&collection_id, 4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conflicting_commit_writes_nothing() {
        let store = SqliteStore::open_memory().unwrap();
        let collection_id = setup(&store, 2).await;

        let mut first = mint_authority(&store, &collection_id).await;
        let mut second = first.clone();

        first.admit().unwrap();
        store
            .commit_mint(&first, 0, &[make_asset(collection_id, 1)])
            .await
            .unwrap();

        second.admit().unwrap();
        let err = store
            .commit_mint(&second, 0, &[make_asset(collection_id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(mint_authority(&store, &collection_id).await.size(), 1);
    }

    #[tokio::test]
    async fn test_reveal_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let collection_id = setup(&store, 1).await;

        let mut mint = mint_authority(&store, &collection_id).await;
        mint.admit().unwrap();
        let asset = make_asset(collection_id, 1);
        store.commit_mint(&mint, 0, &[asset.clone()]).await.unwrap();

        let revealed = asset
            .prepare_reveal(&CommitmentScheme::STANDARD, &["eyes"], &["red"], LOCATOR)
            .unwrap();
        let mut reveal = store
            .get_authority(&collection_id, AuthorityKind::Reveal)
            .await
            .unwrap()
            .unwrap()
            .authority;
        reveal.admit().unwrap();
        store.commit_reveal(&reveal, 0, &revealed).await.unwrap();

        let stored = store.get_asset(asset.id()).await.unwrap().unwrap();
        assert_eq!(stored.content_locator(), Some(LOCATOR));
        assert_eq!(stored.attributes()["eyes"], "red");
    }

    #[tokio::test]
    async fn test_retired_authority_rejects_commits() {
        let store = SqliteStore::open_memory().unwrap();
        let collection_id = setup(&store, 2).await;

        let mut mint = mint_authority(&store, &collection_id).await;
        mint.admit().unwrap();
        store
            .commit_mint(&mint, 0, &[make_asset(collection_id, 1)])
            .await
            .unwrap();
        store
            .retire_authority(&collection_id, AuthorityKind::Mint, 1)
            .await
            .unwrap();

        let record = store
            .get_authority(&collection_id, AuthorityKind::Mint)
            .await
            .unwrap()
            .unwrap();
        assert!(record.retired);

        // A slot remains, but the authority is gone for good.
        mint.admit().unwrap();
        let err = store
            .commit_mint(&mint, 1, &[make_asset(collection_id, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "got {:?}", err);
        assert!(store.lookup(&collection_id, 2).await.unwrap().is_none());

        let err = store
            .retire_authority(&collection_id, AuthorityKind::Mint, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }), "got {:?}", err);

        let record = store
            .get_authority(&collection_id, AuthorityKind::Mint)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.authority.size(), 1);
        assert_eq!(store.list_collections().await.unwrap(), vec![collection_id]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unveil.db");

        let collection_id = {
            let store = SqliteStore::open(&path).unwrap();
            let collection_id = setup(&store, 3).await;
            let mut mint = mint_authority(&store, &collection_id).await;
            mint.admit().unwrap();
            store
                .commit_mint(&mint, 0, &[make_asset(collection_id, 1)])
                .await
                .unwrap();
            collection_id
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(mint_authority(&store, &collection_id).await.size(), 1);
        assert!(store.lookup(&collection_id, 1).await.unwrap().is_some());
    }
}
