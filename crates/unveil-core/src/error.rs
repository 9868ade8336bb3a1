//! Error types for Unveil Core.

use thiserror::Error;

use crate::capacity::AuthorityKind;

/// Errors raised by the commit-reveal core.
///
/// Every variant is terminal for the operation that produced it. Nothing in
/// the core retries or compensates; callers fix their inputs and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("supply exhausted: {count}/{target} assets already minted")]
    SupplyExhausted { count: u64, target: u64 },

    #[error("collection {0} is already initialized")]
    AlreadyInitialized(String),

    #[error("provenance mismatch: committed {committed}, computed {computed}")]
    ProvenanceMismatch { committed: String, computed: String },

    #[error("content not found: {0}")]
    ContentNotFound(String),

    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("supply not exhausted: {count}/{target} assets minted")]
    SupplyNotExhausted { count: u64, target: u64 },

    #[error("reveal incomplete: {count}/{target} assets revealed")]
    RevealIncomplete { count: u64, target: u64 },

    #[error("asset #{0} is already revealed")]
    AlreadyRevealed(u64),

    #[error("no asset minted at number {0}")]
    LookupMiss(u64),

    #[error("duplicate attribute key: {0}")]
    DuplicateAttributeKey(String),

    #[error("reveal target exceeded: {count}/{target} assets already revealed")]
    RevealTargetExceeded { count: u64, target: u64 },

    #[error("capability is scoped to collection {capability}, target belongs to {target}")]
    CollectionMismatch { capability: String, target: String },

    #[error("capability does not match the {0} authority on record")]
    Unauthorized(AuthorityKind),

    #[error("{0} authority has been destroyed")]
    AuthorityRetired(AuthorityKind),

    #[error("invalid content locator: {0}")]
    InvalidLocator(String),

    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    #[error("invalid authority state: {0}")]
    InvalidAuthority(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Whether the error is caused by exhausted or incomplete capacity, as
    /// opposed to bad input or a failed authorization.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            CoreError::SupplyExhausted { .. }
                | CoreError::SupplyNotExhausted { .. }
                | CoreError::RevealIncomplete { .. }
                | CoreError::RevealTargetExceeded { .. }
        )
    }
}
