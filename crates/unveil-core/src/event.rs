//! Notifications emitted after committed operations.
//!
//! Events are best-effort. They are produced only after state is committed
//! and nothing in the kernel reads them back.

use serde::{Deserialize, Serialize};

use crate::capacity::AuthorityKind;
use crate::provenance::ProvenanceCommitment;
use crate::types::{AssetId, CollectionId};

/// A notification about an asset or authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetEvent {
    /// An asset was minted.
    Created {
        collection_id: CollectionId,
        asset_id: AssetId,
        number: u64,
        provenance_commitment: ProvenanceCommitment,
    },

    /// An asset's content was revealed.
    Revealed {
        collection_id: CollectionId,
        asset_id: AssetId,
    },

    /// A capacity authority was destroyed.
    AuthorityDestroyed {
        collection_id: CollectionId,
        kind: AuthorityKind,
    },
}

impl AssetEvent {
    /// The collection the event belongs to.
    pub fn collection_id(&self) -> &CollectionId {
        match self {
            AssetEvent::Created { collection_id, .. }
            | AssetEvent::Revealed { collection_id, .. }
            | AssetEvent::AuthorityDestroyed { collection_id, .. } => collection_id,
        }
    }

    /// Short name, used as the log message.
    pub fn name(&self) -> &'static str {
        match self {
            AssetEvent::Created { .. } => "asset_created",
            AssetEvent::Revealed { .. } => "asset_revealed",
            AssetEvent::AuthorityDestroyed { .. } => "authority_destroyed",
        }
    }
}
