//! Negotiation snapshot, state machine, and encrypted-value handles.
//!
//! The [`Negotiation`] struct mirrors the ledger-resident record field for
//! field. It is a snapshot: whoever fetched it owns it, and a fresh fetch
//! always replaces the whole value. [`NegotiationState`] is the explicit
//! five-phase state machine; transitions on the ledger are strictly forward,
//! but a reader may observe a later state than it last saw (missed events),
//! so each read is taken as authoritative.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParleyError;
use crate::identifiers::{NegotiationId, PartyId, TxRef};

// =============================================================================
// State machine
// =============================================================================

/// Lifecycle phase of a negotiation.
///
/// Numeric values match the ledger's encoding; ordering follows the numeric
/// order, so `state_a <= state_b` means "not later than".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum NegotiationState {
    /// No ranges submitted yet.
    #[default]
    NotStarted = 0,
    /// Employer range stored, candidate range pending.
    EmployerSubmitted = 1,
    /// Both ranges stored; computation may be triggered.
    CandidateSubmitted = 2,
    /// Encrypted computation done, awaiting decrypt and reveal.
    MatchReady = 3,
    /// Cleartext result stored on the ledger.
    Completed = 4,
}

impl NegotiationState {
    /// Numeric encoding used by the ledger.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the negotiation has reached its final phase.
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl TryFrom<u8> for NegotiationState {
    type Error = ParleyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::EmployerSubmitted),
            2 => Ok(Self::CandidateSubmitted),
            3 => Ok(Self::MatchReady),
            4 => Ok(Self::Completed),
            other => Err(ParleyError::ledger_rejected(format!(
                "unknown negotiation state code {other}"
            ))),
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "Not Started",
            Self::EmployerSubmitted => "Employer Submitted",
            Self::CandidateSubmitted => "Candidate Submitted",
            Self::MatchReady => "Match Ready",
            Self::Completed => "Completed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Encrypted-value handles
// =============================================================================

/// Opaque reference to an encrypted value stored on the ledger.
///
/// A handle is exchangeable for its cleartext only through the external
/// decryption gateway. The all-zero handle is the ledger's "nothing here"
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueHandle([u8; 32]);

impl ValueHandle {
    /// The all-zero sentinel: no value stored.
    pub const EMPTY: Self = Self([0u8; 32]);

    /// Wrap raw handle bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw handle bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the all-zero sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for ValueHandle {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| ParleyError::invalid(format!("malformed handle {s:?}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParleyError::invalid(format!("handle {s:?} is not 32 bytes")))?;
        Ok(Self(bytes))
    }
}

// =============================================================================
// Range encryption artifacts
// =============================================================================

/// Ciphertext reference produced by encrypting one range bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue(pub Vec<u8>);

/// Correctness proof covering an encrypted range pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof(pub Vec<u8>);

/// Output of the gateway's range encryption: both bounds plus one proof.
#[derive(Debug, Clone)]
pub struct EncryptedRange {
    /// Encrypted lower bound.
    pub enc_min: EncryptedValue,
    /// Encrypted upper bound.
    pub enc_max: EncryptedValue,
    /// Proof binding both ciphertexts to the caller and contract.
    pub proof: RangeProof,
}

// =============================================================================
// Match result shapes
// =============================================================================

/// Handle pair stored by the encrypted match computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchHandles {
    /// Handle of the encrypted "ranges overlap" boolean.
    pub has_match: ValueHandle,
    /// Handle of the encrypted meeting-point value.
    pub meeting_point: ValueHandle,
}

impl MatchHandles {
    /// True when both handles are present (neither is the empty sentinel).
    pub fn both_present(&self) -> bool {
        !self.has_match.is_empty() && !self.meeting_point.is_empty()
    }
}

/// Handle pair plus the ledger's per-handle public-decryption markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchHandleStatus {
    /// The stored handle pair.
    pub handles: MatchHandles,
    /// Whether the "has match" handle is marked for public decryption.
    pub has_match_marked: bool,
    /// Whether the meeting-point handle is marked for public decryption.
    pub meeting_point_marked: bool,
}

impl MatchHandleStatus {
    /// True when both handles are marked for public decryption.
    pub fn both_marked(&self) -> bool {
        self.has_match_marked && self.meeting_point_marked
    }
}

/// Decrypted match result, in the ledger's fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// Whether the two submitted ranges overlap.
    pub has_match: bool,
    /// Agreed meeting point; meaningful only when `has_match` is true.
    pub meeting_point: u64,
}

// =============================================================================
// Negotiation snapshot
// =============================================================================

/// Result of creating a negotiation on the ledger.
#[derive(Debug, Clone)]
pub struct CreatedNegotiation {
    /// Ledger-assigned identifier.
    pub id: NegotiationId,
    /// Confirmation reference of the creation transaction.
    pub tx: TxRef,
}

/// Full snapshot of one ledger-resident negotiation record.
///
/// Result fields are populated progressively: the handle pair only once
/// `state` is [`NegotiationState::MatchReady`], the decrypted outcome only
/// once it is [`NegotiationState::Completed`]. Parties are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    /// Ledger-assigned identifier.
    pub id: NegotiationId,
    /// Party that created the negotiation.
    pub employer: PartyId,
    /// Invited counterparty.
    pub candidate: PartyId,
    /// Free-form description.
    pub title: String,
    /// Creation instant, epoch seconds.
    pub created_at: u64,
    /// Absolute expiry instant, epoch seconds. Expiry blocks further
    /// submissions but does not itself advance `state`.
    pub deadline: u64,
    /// Current lifecycle phase.
    pub state: NegotiationState,
    /// Handle of the encrypted "ranges overlap" boolean; present only at
    /// `MatchReady`.
    pub has_match_handle: Option<ValueHandle>,
    /// Handle of the encrypted meeting point; present only at `MatchReady`.
    pub meeting_point_handle: Option<ValueHandle>,
    /// Decrypted overlap flag; meaningful only once completed.
    pub has_match_result: bool,
    /// Decrypted meeting point; meaningful only once completed.
    pub meeting_point: u64,
    /// True once the cleartext result has been published on the ledger.
    pub match_revealed: bool,
}

impl Negotiation {
    /// The stored handle pair, available only at `MatchReady`.
    pub fn match_handles(&self) -> Option<MatchHandles> {
        match (self.has_match_handle, self.meeting_point_handle) {
            (Some(has_match), Some(meeting_point)) => Some(MatchHandles {
                has_match,
                meeting_point,
            }),
            _ => None,
        }
    }

    /// Decrypted outcome, available only once the negotiation completed.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.match_revealed.then_some(MatchOutcome {
            has_match: self.has_match_result,
            meeting_point: self.meeting_point,
        })
    }

    /// Which side of the negotiation `party` is on, if either.
    pub fn role_of(&self, party: &PartyId) -> Option<Role> {
        if *party == self.employer {
            Some(Role::Employer)
        } else if *party == self.candidate {
            Some(Role::Candidate)
        } else {
            None
        }
    }
}

/// Side of the negotiation a party acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The party that created the negotiation and submits first.
    Employer,
    /// The invited party, submitting second.
    Candidate,
}

impl Role {
    /// The state a negotiation must be in for this role to submit its range.
    pub fn submission_state(self) -> NegotiationState {
        match self {
            Role::Employer => NegotiationState::NotStarted,
            Role::Candidate => NegotiationState::EmployerSubmitted,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Employer => f.write_str("employer"),
            Role::Candidate => f.write_str("candidate"),
        }
    }
}
