//! Proptest generators for property-based testing.

use proptest::prelude::*;

use unveil_core::{
    AssetId, CollectionId, CommitmentScheme, ContentId, NumberEncoding, PairOrder,
};

/// Generate a random CollectionId.
pub fn collection_id() -> impl Strategy<Value = CollectionId> {
    any::<[u8; 32]>().prop_map(CollectionId::from)
}

/// Generate a random AssetId.
pub fn asset_id() -> impl Strategy<Value = AssetId> {
    any::<[u8; 32]>().prop_map(AssetId::from)
}

/// Generate a random ContentId over the full 256-bit range.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    any::<[u8; 32]>().prop_map(ContentId::from_le_bytes)
}

/// Generate a well-formed content locator.
pub fn locator() -> impl Strategy<Value = String> {
    content_id().prop_map(|id| id.to_locator())
}

/// Generate an asset sequence number (1-indexed).
pub fn number() -> impl Strategy<Value = u64> {
    1u64..=u64::MAX
}

/// Generate a commitment scheme.
pub fn scheme() -> impl Strategy<Value = CommitmentScheme> {
    let number = prop_oneof![Just(NumberEncoding::Decimal), Just(NumberEncoding::RawLe64)];
    let pairs = prop_oneof![Just(PairOrder::Interleaved), Just(PairOrder::KeysThenValues)];
    (number, pairs).prop_map(|(number, pairs)| CommitmentScheme { number, pairs })
}

/// Generate a trait key.
pub fn trait_key() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,15}".prop_map(String::from)
}

/// Generate a trait value. May be empty.
pub fn trait_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 -]{0,24}".prop_map(String::from)
}

/// Generate parallel key and value lists with distinct keys.
pub fn traits(max_len: usize) -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::btree_map(trait_key(), trait_value(), 0..=max_len)
        .prop_map(|map| map.into_iter().unzip())
}

/// Parameters for computing a commitment.
#[derive(Debug, Clone)]
pub struct RevealParams {
    pub scheme: CommitmentScheme,
    pub number: u64,
    pub keys: Vec<String>,
    pub values: Vec<String>,
    pub locator: String,
}

impl Arbitrary for RevealParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (scheme(), number(), traits(12), locator())
            .prop_map(|(scheme, number, (keys, values), locator)| RevealParams {
                scheme,
                number,
                keys,
                values,
                locator,
            })
            .boxed()
    }
}

impl RevealParams {
    /// The digest these parameters commit to.
    pub fn digest(&self) -> String {
        // Keys and values are generated pairwise, so lengths always match.
        unveil_core::digest_with(&self.scheme, self.number, &self.keys, &self.values, &self.locator)
            .unwrap_or_default()
    }
}
