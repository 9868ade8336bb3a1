//! Content gate: the existence check a reveal runs against content storage.
//!
//! The kernel never fetches content. It only asks whether the content a
//! locator points at has been published, and refuses the reveal otherwise.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use unveil_core::ContentId;

/// Errors from a content gate backend.
#[derive(Debug, Error)]
pub enum GateError {
    /// The backend could not answer.
    #[error("content gate unavailable: {0}")]
    Unavailable(String),
}

/// External check for content referenced by a locator.
#[async_trait]
pub trait ContentGate: Send + Sync {
    /// Whether the content has been published.
    async fn exists(&self, id: &ContentId) -> Result<bool, GateError>;
}

/// A content gate backed by an in-memory set of published ids.
#[derive(Debug, Default)]
pub struct MemoryContentGate {
    published: RwLock<HashSet<ContentId>>,
}

impl MemoryContentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark content as published.
    pub fn publish(&self, id: ContentId) {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
    }

    /// Remove previously published content.
    pub fn withdraw(&self, id: &ContentId) -> bool {
        self.published
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.published.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentGate for MemoryContentGate {
    async fn exists(&self, id: &ContentId) -> Result<bool, GateError> {
        let published = self
            .published
            .read()
            .map_err(|e| GateError::Unavailable(e.to_string()))?;
        Ok(published.contains(id))
    }
}

#[async_trait]
impl<G: ContentGate + ?Sized> ContentGate for std::sync::Arc<G> {
    async fn exists(&self, id: &ContentId) -> Result<bool, GateError> {
        (**self).exists(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_withdraw() {
        let gate = MemoryContentGate::new();
        let id = ContentId::from_u128(42);

        assert!(!gate.exists(&id).await.unwrap());
        gate.publish(id);
        assert!(gate.exists(&id).await.unwrap());
        assert_eq!(gate.len(), 1);

        assert!(gate.withdraw(&id));
        assert!(!gate.exists(&id).await.unwrap());
        assert!(gate.is_empty());
    }
}
