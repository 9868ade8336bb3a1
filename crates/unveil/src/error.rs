//! Error types for the Kernel.

use std::fmt;

use thiserror::Error;
use unveil_core::{AssetId, Capability, CapabilityKind, CollectionId, CoreError};
use unveil_store::StoreError;

use crate::gate::GateError;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Protocol error from the core state machine or verification.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Content gate error.
    #[error("content gate error: {0}")]
    Gate(#[from] GateError),

    /// Asset not found.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// No authorities are on record for the collection.
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KernelError {
    /// The core error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            KernelError::Core(e) => Some(e),
            _ => None,
        }
    }

    /// Whether a concurrent writer advanced the same authority first.
    pub fn is_conflict(&self) -> bool {
        matches!(self, KernelError::Store(StoreError::Conflict { .. }))
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// A refused destroy, handing the capability back to the caller.
pub struct DestroyRefused<K: CapabilityKind> {
    /// Why the authority could not be destroyed.
    pub error: KernelError,
    /// The capability, still valid.
    pub capability: Capability<K>,
}

impl<K: CapabilityKind> DestroyRefused<K> {
    /// Drop the capability and keep the error.
    pub fn into_error(self) -> KernelError {
        self.error
    }
}

impl<K: CapabilityKind> fmt::Debug for DestroyRefused<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestroyRefused")
            .field("error", &self.error)
            .field("capability", &self.capability)
            .finish()
    }
}

impl<K: CapabilityKind> fmt::Display for DestroyRefused<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destroy refused: {}", self.error)
    }
}

impl<K: CapabilityKind> std::error::Error for DestroyRefused<K> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<K: CapabilityKind> From<DestroyRefused<K>> for KernelError {
    fn from(refused: DestroyRefused<K>) -> Self {
        refused.error
    }
}
