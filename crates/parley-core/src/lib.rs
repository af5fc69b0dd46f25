//! Parley Core - Negotiation Domain Foundation
//!
//! This crate provides the foundational types and effect interfaces for the
//! Parley negotiation lifecycle. It contains only pure data definitions and
//! trait signatures with no orchestration logic.
//!
//! # Contents
//!
//! - Identifiers: [`NegotiationId`], [`PartyId`], [`TxRef`], [`ContractAddress`]
//! - The negotiation snapshot and its explicit state machine
//!   ([`Negotiation`], [`NegotiationState`])
//! - Opaque encrypted-value references ([`ValueHandle`]) with the all-zero
//!   "empty" sentinel
//! - Ledger event kinds consumed by the synchronization layer ([`LedgerEvent`])
//! - The unified error taxonomy ([`ParleyError`])
//! - Effect interfaces for the two external collaborators (ledger access and
//!   the encryption/decryption gateway) plus time
//!
//! # Design
//!
//! All durable state lives in the ledger. Types here are snapshots owned by
//! whoever fetched them; nothing in this crate mutates ledger state. Every
//! state read is authoritative - callers must never derive a state locally by
//! incrementing a counter.

#![forbid(unsafe_code)]

/// Negotiation, party, and transaction identifiers
pub mod identifiers;

/// Negotiation snapshot, state machine, and encrypted-value handles
pub mod negotiation;

/// Ledger event kinds for live synchronization
pub mod events;

/// Unified error handling
pub mod errors;

/// Pure effect interfaces (no implementations)
pub mod effects;

pub use errors::{ParleyError, ParleyResult};
pub use events::LedgerEvent;
pub use identifiers::{ContractAddress, NegotiationId, PartyId, TxRef};
pub use negotiation::{
    CreatedNegotiation, EncryptedRange, EncryptedValue, MatchHandleStatus, MatchHandles,
    MatchOutcome, Negotiation, NegotiationState, RangeProof, Role, ValueHandle,
};
