//! Capability tokens for privileged operations.
//!
//! A capability is a bearer token scoped to one collection and one
//! [`AuthorityKind`]. It carries a 32-byte secret; only the secret's
//! fingerprint is persisted next to the authority it unlocks. Capabilities are
//! deliberately not `Clone`: destroying an authority consumes its token.

use rand::RngCore;
use std::fmt;
use std::marker::PhantomData;

use crate::capacity::AuthorityKind;
use crate::crypto::Blake3Hash;
use crate::error::{CoreError, Result};
use crate::types::CollectionId;

/// Domain prefix for capability fingerprints.
const FINGERPRINT_DOMAIN: &[u8] = b"unveil/capability/v1";

mod sealed {
    pub trait Sealed {}
}

/// Marker trait tying a capability type to the authority it unlocks.
pub trait CapabilityKind: sealed::Sealed {
    const KIND: AuthorityKind;
}

/// Marker for the mint capability.
#[derive(Debug)]
pub enum MintRight {}

/// Marker for the reveal capability.
#[derive(Debug)]
pub enum RevealRight {}

impl sealed::Sealed for MintRight {}
impl sealed::Sealed for RevealRight {}

impl CapabilityKind for MintRight {
    const KIND: AuthorityKind = AuthorityKind::Mint;
}

impl CapabilityKind for RevealRight {
    const KIND: AuthorityKind = AuthorityKind::Reveal;
}

/// A collection-scoped capability.
pub struct Capability<K: CapabilityKind> {
    collection_id: CollectionId,
    secret: [u8; 32],
    _kind: PhantomData<K>,
}

/// Required to mint into a collection.
pub type MintCap = Capability<MintRight>;

/// Required to reveal assets of a collection.
pub type RevealCap = Capability<RevealRight>;

impl<K: CapabilityKind> Capability<K> {
    /// Issue a new capability with a fresh random secret.
    pub fn issue(collection_id: CollectionId) -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::from_parts(collection_id, secret)
    }

    /// Rebuild a capability the host persisted earlier.
    pub fn from_parts(collection_id: CollectionId, secret: [u8; 32]) -> Self {
        Self {
            collection_id,
            secret,
            _kind: PhantomData,
        }
    }

    /// The authority this capability unlocks.
    pub fn kind(&self) -> AuthorityKind {
        K::KIND
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.collection_id
    }

    /// The secret, for hosts that persist tokens.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Fingerprint stored alongside the authority.
    pub fn fingerprint(&self) -> Blake3Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(&[K::KIND.to_u8()]);
        hasher.update(&self.collection_id.0);
        hasher.update(&self.secret);
        Blake3Hash(*hasher.finalize().as_bytes())
    }

    /// Check this capability against the target's collection and the
    /// fingerprint on record.
    pub fn authorize(&self, target: &CollectionId, on_record: &Blake3Hash) -> Result<()> {
        if &self.collection_id != target {
            return Err(CoreError::CollectionMismatch {
                capability: self.collection_id.to_string(),
                target: target.to_string(),
            });
        }
        if !self.fingerprint().ct_eq(on_record) {
            return Err(CoreError::Unauthorized(K::KIND));
        }
        Ok(())
    }
}

impl<K: CapabilityKind> fmt::Debug for Capability<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({} {}, secret: <redacted>)", K::KIND, self.collection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_matching() {
        let collection = CollectionId::from_bytes([0x01; 32]);
        let cap = MintCap::issue(collection);
        let fingerprint = cap.fingerprint();
        cap.authorize(&collection, &fingerprint).unwrap();
        assert_eq!(cap.kind(), AuthorityKind::Mint);
    }

    #[test]
    fn test_authorize_wrong_collection() {
        let collection = CollectionId::from_bytes([0x01; 32]);
        let other = CollectionId::from_bytes([0x02; 32]);
        let cap = MintCap::issue(collection);

        let err = cap.authorize(&other, &cap.fingerprint()).unwrap_err();
        assert!(matches!(err, CoreError::CollectionMismatch { .. }));
    }

    #[test]
    fn test_authorize_forged_secret() {
        let collection = CollectionId::from_bytes([0x01; 32]);
        let real = RevealCap::issue(collection);
        let forged = RevealCap::from_parts(collection, [0u8; 32]);

        let err = forged.authorize(&collection, &real.fingerprint()).unwrap_err();
        assert_eq!(err, CoreError::Unauthorized(AuthorityKind::Reveal));
    }

    #[test]
    fn test_fingerprint_binds_kind() {
        let collection = CollectionId::from_bytes([0x01; 32]);
        let secret = [0x55; 32];
        let mint = MintCap::from_parts(collection, secret);
        let reveal = RevealCap::from_parts(collection, secret);
        assert_ne!(mint.fingerprint(), reveal.fingerprint());
    }

    #[test]
    fn test_from_parts_roundtrip() {
        let collection = CollectionId::from_bytes([0x07; 32]);
        let cap = MintCap::issue(collection);
        let restored = MintCap::from_parts(*cap.collection_id(), *cap.secret_bytes());
        assert_eq!(cap.fingerprint(), restored.fingerprint());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cap = MintCap::from_parts(CollectionId::from_bytes([0x01; 32]), [0xee; 32]);
        let debug = format!("{:?}", cap);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("eeee"));
    }
}
