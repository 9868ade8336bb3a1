//! # Unveil
//!
//! The unified API for Unveil: fixed-size asset collections that are minted
//! against a provenance commitment and revealed later, once their content is
//! published.
//!
//! ## Overview
//!
//! - **Commitment**: every asset carries a SHA-256 digest over its future
//!   attributes and content locator, fixed at mint.
//! - **Reveal**: content is accepted only if it hashes to that digest, and
//!   only once per asset.
//! - **Capacity**: per-collection mint and reveal authorities count up to the
//!   target supply and never past it.
//! - **Capabilities**: only holders of a collection's `MintCap` / `RevealCap`
//!   may mint, reveal, or destroy the spent authorities.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use unveil::{digest, Kernel, KernelConfig, MemoryContentGate, MintRequest};
//! use unveil::core::ContentId;
//! use unveil::store::SqliteStore;
//!
//! async fn example() {
//!     // Open storage and the content gate
//!     let store = SqliteStore::open("unveil.db").unwrap();
//!     let gate = MemoryContentGate::new();
//!
//!     // Create the kernel
//!     let kernel = Kernel::new(store, gate, KernelConfig::default());
//!
//!     // Create a collection of 10 assets
//!     let handle = kernel.create_collection(10).await.unwrap();
//!
//!     // Mint against a commitment
//!     let locator = "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=";
//!     let commitment = digest(1, &["eyes"], &["red"], locator).unwrap();
//!     let asset = kernel
//!         .mint(&handle.mint_cap, MintRequest::new("Hidden #1", "soon", commitment))
//!         .await
//!         .unwrap();
//!
//!     // Publish the content, then reveal
//!     kernel.gate().publish(ContentId::from_locator(locator).unwrap());
//!     kernel
//!         .reveal(&handle.reveal_cap, asset.id(), &["eyes"], &["red"], locator)
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `unveil::core` - Core primitives (commitments, authorities, records)
//! - `unveil::store` - Storage abstraction and SQLite

pub mod error;
pub mod events;
pub mod gate;
pub mod kernel;

// Re-export component crates
pub use unveil_core as core;
pub use unveil_store as store;

// Re-export main types for convenience
pub use error::{DestroyRefused, KernelError, Result};
pub use events::{EventSink, RecordingSink, TracingSink};
pub use gate::{ContentGate, GateError, MemoryContentGate};
pub use kernel::{CollectionHandle, Kernel, KernelConfig, DEFAULT_MAX_BULK_MINT};

// Re-export commonly used core types
pub use unveil_core::{
    digest, AssetEvent, AssetId, AssetRecord, AuthorityKind, CollectionId, CommitmentScheme,
    ContentId, CoreError, MintCap, MintRequest, ProvenanceCommitment, Retirement, RevealCap,
};
