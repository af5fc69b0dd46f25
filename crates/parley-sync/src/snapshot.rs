//! Published snapshot shape.

use serde::{Deserialize, Serialize};

use parley_core::{Negotiation, NegotiationId, NegotiationState};

/// What subscribers of a watched negotiation see.
///
/// A fresh watch starts at `Loading` until the first fetch lands. `Ready`
/// always carries a complete, internally-consistent ledger read; the
/// monitor never patches individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationSnapshot {
    /// First fetch not yet completed.
    Loading {
        /// Negotiation being fetched.
        id: NegotiationId,
    },
    /// Latest complete ledger read.
    Ready {
        /// Full negotiation record.
        negotiation: Negotiation,
        /// Whether the deadline has passed. Orthogonal to `state`.
        is_expired: bool,
        /// Last relayer-callback failure recorded on the ledger, if any.
        last_error: Option<String>,
    },
}

impl NegotiationSnapshot {
    /// Negotiation this snapshot describes.
    pub fn id(&self) -> NegotiationId {
        match self {
            Self::Loading { id } => *id,
            Self::Ready { negotiation, .. } => negotiation.id,
        }
    }

    /// Lifecycle phase, once known.
    pub fn state(&self) -> Option<NegotiationState> {
        match self {
            Self::Loading { .. } => None,
            Self::Ready { negotiation, .. } => Some(negotiation.state),
        }
    }

    /// True until the first fetch completes.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// The underlying negotiation, once known.
    pub fn negotiation(&self) -> Option<&Negotiation> {
        match self {
            Self::Loading { .. } => None,
            Self::Ready { negotiation, .. } => Some(negotiation),
        }
    }
}
