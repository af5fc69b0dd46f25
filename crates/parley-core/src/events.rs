//! Ledger event kinds for live negotiation updates.
//!
//! Delivery is best-effort: events can be missed across reconnects or
//! provider gaps, so consumers must pair them with periodic re-reads and
//! treat every event purely as a "re-fetch this negotiation" hint rather
//! than as a state patch.

use serde::{Deserialize, Serialize};

use crate::identifiers::{NegotiationId, PartyId};
use crate::negotiation::MatchOutcome;

/// One ledger-emitted negotiation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A negotiation record was created.
    Created {
        /// Affected negotiation.
        id: NegotiationId,
        /// Creating party.
        employer: PartyId,
        /// Invited counterparty.
        candidate: PartyId,
    },
    /// The employer's encrypted range was stored.
    EmployerSubmitted {
        /// Affected negotiation.
        id: NegotiationId,
    },
    /// The candidate's encrypted range was stored.
    CandidateSubmitted {
        /// Affected negotiation.
        id: NegotiationId,
    },
    /// The encrypted match computation was requested.
    MatchStarted {
        /// Affected negotiation.
        id: NegotiationId,
    },
    /// The cleartext result was published.
    MatchRevealed {
        /// Affected negotiation.
        id: NegotiationId,
        /// Revealed outcome.
        outcome: MatchOutcome,
    },
    /// A relayer callback failed on the ledger side.
    CallbackFailed {
        /// Affected negotiation.
        id: NegotiationId,
        /// Failure reason as reported by the ledger.
        reason: String,
    },
}

impl LedgerEvent {
    /// The negotiation this event concerns.
    pub fn negotiation_id(&self) -> NegotiationId {
        match self {
            Self::Created { id, .. }
            | Self::EmployerSubmitted { id }
            | Self::CandidateSubmitted { id }
            | Self::MatchStarted { id }
            | Self::MatchRevealed { id, .. }
            | Self::CallbackFailed { id, .. } => *id,
        }
    }
}
