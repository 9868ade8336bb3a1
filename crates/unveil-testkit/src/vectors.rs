//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical input layout and digest for each
//! commitment scheme, so tools that publish commitments can check they
//! agree with the kernel byte for byte.

use serde::Serialize;
use unveil_core::{digest_with, CommitmentScheme, NumberEncoding, PairOrder};

/// A golden test vector.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// How the canonical input is laid out.
    pub scheme: CommitmentScheme,
    /// Asset sequence number.
    pub number: u64,
    /// Trait keys, in commitment order.
    pub keys: &'static [&'static str],
    /// Trait values, parallel to `keys`.
    pub values: &'static [&'static str],
    /// Content locator.
    pub locator: &'static str,
    /// Expected digest (hex).
    pub expected_digest: &'static str,
}

const KEYS: &[&str] = &[
    "aura",
    "background",
    "clothing",
    "decal",
    "headwear",
    "highlight",
    "internals",
    "mask",
    "screen",
    "skin",
];

const VALUES: &[&str] = &[
    "none",
    "green",
    "none",
    "none",
    "classic-antenna",
    "green",
    "gray",
    "hyottoko",
    "tamashi-eyes",
    "silver",
];

const LOCATOR: &str = "MvcX8hU5esyvO1M8NRCrleSQjS9YaH57YBedKIUpYn8";

const fn scheme(number: NumberEncoding, pairs: PairOrder) -> CommitmentScheme {
    CommitmentScheme { number, pairs }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "ten traits, standard scheme",
            scheme: CommitmentScheme::STANDARD,
            number: 100,
            keys: KEYS,
            values: VALUES,
            locator: LOCATOR,
            expected_digest: "72a45041e98b987a331dc20be6eec2e2d87603b964bf688161682f082313c22f",
        },
        GoldenVector {
            name: "ten traits, keys then values",
            scheme: scheme(NumberEncoding::Decimal, PairOrder::KeysThenValues),
            number: 100,
            keys: KEYS,
            values: VALUES,
            locator: LOCATOR,
            expected_digest: "e53e08cbd7cf491dea3194ee7dd4f740ab040728fead6372ee14784c9af8e687",
        },
        GoldenVector {
            name: "ten traits, raw number interleaved",
            scheme: scheme(NumberEncoding::RawLe64, PairOrder::Interleaved),
            number: 100,
            keys: KEYS,
            values: VALUES,
            locator: LOCATOR,
            expected_digest: "a68895bea0083953b7d247ebc47e8fcfc754855c95ef3fa59eff813715a5585f",
        },
        GoldenVector {
            name: "ten traits, raw number keys then values",
            scheme: scheme(NumberEncoding::RawLe64, PairOrder::KeysThenValues),
            number: 100,
            keys: KEYS,
            values: VALUES,
            locator: LOCATOR,
            expected_digest: "2c0824fa8623a91a8fa6d61254030e24e8f264702203037bb6258e6f2641187c",
        },
        GoldenVector {
            name: "single trait",
            scheme: CommitmentScheme::STANDARD,
            number: 1,
            keys: &["eyes"],
            values: &["red"],
            locator: LOCATOR,
            expected_digest: "191f73c84fa2d0899bb4748ad01913fbb5f0f6b973cf076ce8b27fb201bf2a35",
        },
        GoldenVector {
            name: "locator only",
            scheme: CommitmentScheme::STANDARD,
            number: 2,
            keys: &[],
            values: &[],
            locator: LOCATOR,
            expected_digest: "9bfe5e3f265fabe7464d43a957856ca158409d317ef16422fda5839f5f8619c7",
        },
        GoldenVector {
            name: "padded locator",
            scheme: CommitmentScheme::STANDARD,
            number: 1,
            keys: &["eyes"],
            values: &["red"],
            locator: "DbuJ7GRmwjoqo1LDp2qk/H/aI1ycOi2lH3Ka4ATdLzo=",
            expected_digest: "1b7d711ede217bf43cdfc54025ea1ce3083e125f98ba42283cdaf3656f1eaab8",
        },
    ]
}

/// Compute the digest a vector describes.
pub fn compute_digest(vector: &GoldenVector) -> unveil_core::Result<String> {
    digest_with(
        &vector.scheme,
        vector.number,
        vector.keys,
        vector.values,
        vector.locator,
    )
}

/// Verify all golden vectors against this build.
///
/// Returns `(name, matches, computed)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let computed = compute_digest(v).unwrap_or_else(|e| e.to_string());
            let matches = computed == v.expected_digest;
            (v.name.to_string(), matches, computed)
        })
        .collect()
}

/// Export all vectors as pretty JSON for other implementations.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&all_vectors())
}
