//! # Unveil Testkit
//!
//! Testing utilities for Unveil.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known commitments with expected digests for cross-implementation verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A ready-wired kernel and secret assets that know their commitments
//!
//! ## Golden Vectors
//!
//! ```rust
//! use unveil_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, digest) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, digest);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use unveil_testkit::generators::RevealParams;
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(params: RevealParams) {
//!         prop_assert_eq!(params.digest(), params.digest());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use unveil_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let (handle, secrets) = fixture.minted_collection(10).await?;
//! fixture.reveal_secret(&handle, &secrets[0]).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{SecretAsset, TestFixture, TRAIT_KEYS};
pub use generators::RevealParams;
pub use vectors::{all_vectors, compute_digest, verify_all_vectors, GoldenVector};
