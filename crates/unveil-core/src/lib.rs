//! # Unveil Core
//!
//! Pure primitives for commit-reveal asset collections: provenance
//! commitments, capacity authorities, capabilities, and asset records.
//!
//! This crate contains no I/O, no storage, no async. Every operation either
//! returns a new value or mutates a value the caller owns.
//!
//! ## Key Types
//!
//! - [`CapacityAuthority`] - Counter with a fixed target and a one-way phase
//! - [`MintCap`] / [`RevealCap`] - Collection-scoped capability tokens
//! - [`AssetRecord`] - A minted asset, revealed at most once
//! - [`ProvenanceCommitment`] - The digest an asset is bound to at mint
//! - [`ContentId`] - 256-bit content identifier with a base64 locator form
//!
//! ## Commitments
//!
//! ```rust
//! use unveil_core::{digest, CommitmentScheme, ProvenanceCommitment};
//!
//! let keys = ["eyes", "hat"];
//! let values = ["red", "cap"];
//! let locator = "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=";
//!
//! let commitment = ProvenanceCommitment::new(digest(1, &keys, &values, locator).unwrap());
//! commitment
//!     .verify(&CommitmentScheme::STANDARD, 1, &keys, &values, locator)
//!     .unwrap();
//! ```

pub mod asset;
pub mod canonical;
pub mod capability;
pub mod capacity;
pub mod crypto;
pub mod error;
pub mod event;
pub mod locator;
pub mod provenance;
pub mod types;
pub mod validation;

pub use asset::{AssetRecord, MintRequest};
pub use canonical::{CommitmentScheme, NumberEncoding, PairOrder};
pub use capability::{Capability, CapabilityKind, MintCap, MintRight, RevealCap, RevealRight};
pub use capacity::{AuthorityKind, CapacityAuthority, Phase, Retirement};
pub use crypto::{Blake3Hash, Sha256Hash};
pub use error::{CoreError, Result};
pub use event::AssetEvent;
pub use locator::ContentId;
pub use provenance::{digest, digest_with, ProvenanceCommitment};
pub use types::{AssetId, CollectionId};
pub use validation::build_attributes;
