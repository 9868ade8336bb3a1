//! # Unveil Store
//!
//! Storage abstraction for Unveil. Provides a trait-based interface for
//! authority and asset persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`Store`] trait,
//! allowing the kernel to be storage-agnostic. The primary implementation
//! is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AuthorityRecord`] - A persisted capacity authority
//! - [`InsertResult`] - Result of inserting authorities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use unveil_core::{AuthorityKind, CollectionId};
//! use unveil_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("unveil.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let collection_id = CollectionId::generate();
//!     let mint = store.get_authority(&collection_id, AuthorityKind::Mint).await.unwrap();
//!     assert!(mint.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic commits**: authority counters and asset records change together
//! - **Compare-and-swap**: a commit computed from a stale counter is a `Conflict`
//! - **Permanent retirement**: destroyed authorities stay on record, retired

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuthorityRecord, InsertResult, Store, StoreExt};
