//! Ledger/contract access effect interface.
//!
//! One trait covering every contract operation the orchestrator consumes:
//! sending transactions, reading stored fields, and subscribing to events.
//! Implementations are expected to await transaction confirmation before
//! returning a [`TxRef`]; a returned reference means the ledger accepted the
//! operation and the next state read will reflect it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::ParleyResult;
use crate::events::LedgerEvent;
use crate::identifiers::{NegotiationId, PartyId, TxRef};
use crate::negotiation::{
    CreatedNegotiation, EncryptedValue, MatchHandleStatus, MatchHandles, Negotiation, RangeProof,
};

/// Ledger/contract access operations.
#[async_trait]
pub trait LedgerEffects: Send + Sync {
    /// Create a negotiation record inviting `candidate`, expiring
    /// `deadline_secs` after creation.
    async fn create_negotiation(
        &self,
        candidate: &PartyId,
        title: &str,
        deadline_secs: u64,
    ) -> ParleyResult<CreatedNegotiation>;

    /// Store the employer's encrypted range. Rejected unless the negotiation
    /// is at `NotStarted` and not expired.
    async fn submit_employer_range(
        &self,
        id: NegotiationId,
        enc_min: &EncryptedValue,
        enc_max: &EncryptedValue,
        proof: &RangeProof,
    ) -> ParleyResult<TxRef>;

    /// Store the candidate's encrypted range. Rejected unless the negotiation
    /// is at `EmployerSubmitted` and not expired.
    async fn submit_candidate_range(
        &self,
        id: NegotiationId,
        enc_min: &EncryptedValue,
        enc_max: &EncryptedValue,
        proof: &RangeProof,
    ) -> ParleyResult<TxRef>;

    /// Request the encrypted match computation. Rejected unless both ranges
    /// are present.
    async fn trigger_match(&self, id: NegotiationId) -> ParleyResult<TxRef>;

    /// Publish the decrypted result, finalizing the negotiation.
    async fn reveal_match(
        &self,
        id: NegotiationId,
        has_match: bool,
        meeting_point: u64,
    ) -> ParleyResult<TxRef>;

    /// Read the full negotiation snapshot.
    async fn read_negotiation(&self, id: NegotiationId) -> ParleyResult<Negotiation>;

    /// Whether the negotiation's deadline has passed.
    async fn is_expired(&self, id: NegotiationId) -> ParleyResult<bool>;

    /// Read the stored match handle pair.
    async fn match_handles(&self, id: NegotiationId) -> ParleyResult<MatchHandles>;

    /// Read the handle pair together with the per-handle public-decryption
    /// markers.
    async fn match_handles_with_status(&self, id: NegotiationId)
        -> ParleyResult<MatchHandleStatus>;

    /// All negotiation ids `party` participates in, either side.
    async fn user_negotiations(&self, party: &PartyId) -> ParleyResult<Vec<NegotiationId>>;

    /// Last relayer-callback failure recorded for this negotiation, if any.
    async fn callback_debug_info(&self, id: NegotiationId) -> ParleyResult<Option<String>>;

    /// Identity of the chain the ledger connection is on.
    async fn chain_id(&self) -> ParleyResult<u64>;

    /// Whether contract code exists at the configured address.
    async fn has_contract_code(&self) -> ParleyResult<bool>;

    /// Subscribe to negotiation events. Each call registers a process-wide
    /// listener; the returned channel closes when listeners are cleared.
    async fn subscribe_events(&self) -> ParleyResult<mpsc::Receiver<LedgerEvent>>;

    /// Tear down every registered event listener. Required once nothing is
    /// being watched, so a provider reconnect cannot double-deliver.
    fn clear_event_listeners(&self);
}
