//! Capacity authority: a counter with a fixed target and a one-way phase.
//!
//! One authority of each [`AuthorityKind`] exists per collection. The mint
//! authority counts created assets, the reveal authority counts revealed
//! assets. Both follow the same state machine:
//!
//! ```text
//! Active { count < target } --admit--> Active | Complete
//! Complete { count == target }          (terminal; admit always fails)
//! ```
//!
//! `count` never decreases and never exceeds `target`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{CoreError, Result};
use crate::types::CollectionId;

/// Which counter an authority tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityKind {
    /// Counts created assets.
    Mint,
    /// Counts revealed assets.
    Reveal,
}

impl AuthorityKind {
    /// Convert to the wire/storage discriminant.
    pub fn to_u8(self) -> u8 {
        match self {
            AuthorityKind::Mint => 0,
            AuthorityKind::Reveal => 1,
        }
    }

    /// Parse from the wire/storage discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(AuthorityKind::Mint),
            1 => Some(AuthorityKind::Reveal),
            _ => None,
        }
    }
}

impl fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityKind::Mint => f.write_str("mint"),
            AuthorityKind::Reveal => f.write_str("reveal"),
        }
    }
}

/// Lifecycle phase of an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Slots remain.
    Active,
    /// `count == target`. Terminal.
    Complete,
}

/// A capacity-tracking authority for one collection.
///
/// Not `Deserialize`: persisted authorities come back through
/// [`CapacityAuthority::restore`] so the invariants are re-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityAuthority {
    collection_id: CollectionId,
    kind: AuthorityKind,
    count: u64,
    target: u64,
    phase: Phase,
}

/// What remains after an authority is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retirement {
    pub collection_id: CollectionId,
    pub kind: AuthorityKind,
    pub count: u64,
}

impl CapacityAuthority {
    /// Create a fresh authority with `count = 0`.
    ///
    /// A target of zero produces an authority that is complete at birth.
    pub fn new(collection_id: CollectionId, kind: AuthorityKind, target: u64) -> Self {
        Self {
            collection_id,
            kind,
            count: 0,
            target,
            phase: if target == 0 { Phase::Complete } else { Phase::Active },
        }
    }

    /// Rebuild an authority from persisted fields.
    ///
    /// The phase is derived, so a stored record can never claim `Complete`
    /// while slots remain.
    pub fn restore(
        collection_id: CollectionId,
        kind: AuthorityKind,
        count: u64,
        target: u64,
    ) -> Result<Self> {
        if count > target {
            return Err(CoreError::InvalidAuthority(format!(
                "{} authority count {} exceeds target {}",
                kind, count, target
            )));
        }
        Ok(Self {
            collection_id,
            kind,
            count,
            target,
            phase: if count == target { Phase::Complete } else { Phase::Active },
        })
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.collection_id
    }

    pub fn kind(&self) -> AuthorityKind {
        self.kind
    }

    /// Number of admitted operations so far.
    pub fn size(&self) -> u64 {
        self.count
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn remaining(&self) -> u64 {
        self.target - self.count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Admit one operation.
    ///
    /// Returns the sequence number assigned to it, `old_count + 1`.
    pub fn admit(&mut self) -> Result<u64> {
        self.admit_many(1).map(|range| *range.start())
    }

    /// Admit `m` operations at once, or none of them.
    ///
    /// Returns the contiguous range of assigned sequence numbers. Admitting
    /// zero operations succeeds with an empty range and changes nothing.
    pub fn admit_many(&mut self, m: u64) -> Result<RangeInclusive<u64>> {
        if m == 0 {
            #[allow(clippy::reversed_empty_ranges)]
            return Ok(1..=0);
        }
        if self.is_complete() || self.remaining() < m {
            return Err(self.exhausted());
        }

        let first = self.count + 1;
        self.count += m;
        if self.count == self.target {
            self.phase = Phase::Complete;
        }
        Ok(first..=self.count)
    }

    /// Check that the authority may be destroyed.
    pub fn check_destroy(&self) -> Result<()> {
        if self.count == self.target {
            return Ok(());
        }
        Err(match self.kind {
            AuthorityKind::Mint => CoreError::SupplyNotExhausted {
                count: self.count,
                target: self.target,
            },
            AuthorityKind::Reveal => CoreError::RevealIncomplete {
                count: self.count,
                target: self.target,
            },
        })
    }

    /// Destroy the authority. Only possible once `count == target`.
    pub fn destroy(self) -> Result<Retirement> {
        self.check_destroy()?;
        Ok(Retirement {
            collection_id: self.collection_id,
            kind: self.kind,
            count: self.count,
        })
    }

    fn exhausted(&self) -> CoreError {
        match self.kind {
            AuthorityKind::Mint => CoreError::SupplyExhausted {
                count: self.count,
                target: self.target,
            },
            AuthorityKind::Reveal => CoreError::RevealTargetExceeded {
                count: self.count,
                target: self.target,
            },
        }
    }
}
