//! In-memory mock ledger.
//!
//! Enforces the same preconditions as the negotiation contract: one range
//! per role, strictly forward state transitions, expiry blocking
//! submissions. The encrypted match computation is simulated in cleartext
//! (the mock "ciphertext" is just the little-endian bound value) purely so
//! end-to-end tests get deterministic results.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use parley_core::effects::{ClearValue, LedgerEffects};
use parley_core::{
    CreatedNegotiation, EncryptedValue, LedgerEvent, MatchHandleStatus, MatchHandles,
    MatchOutcome, Negotiation, NegotiationId, NegotiationState, ParleyError, ParleyResult,
    PartyId, RangeProof, TxRef, ValueHandle,
};

use crate::clock::MockClock;
use crate::gateway::HandleVault;

const EVENT_BUFFER: usize = 64;

/// Default chain id the mock reports, matching a local devnet.
pub const MOCK_CHAIN_ID: u64 = 31_337;

struct Record {
    negotiation: Negotiation,
    employer_range: Option<(u64, u64)>,
    candidate_range: Option<(u64, u64)>,
    marked: bool,
    callback_error: Option<String>,
}

struct LedgerInner {
    next_id: u64,
    tx_seq: u64,
    caller: PartyId,
    records: HashMap<NegotiationId, Record>,
    listeners: Vec<mpsc::Sender<LedgerEvent>>,
    transactions: Vec<String>,
    injected_failures: VecDeque<ParleyError>,
}

/// In-memory ledger implementing [`LedgerEffects`].
pub struct MockLedger {
    clock: Arc<MockClock>,
    vault: Arc<HandleVault>,
    chain_id: u64,
    has_code: bool,
    fail_status_query: std::sync::atomic::AtomicBool,
    inner: Mutex<LedgerInner>,
}

impl MockLedger {
    /// Create a ledger sharing `clock` for expiry checks and `vault` with
    /// the gateway that will decrypt its handles.
    pub fn new(clock: Arc<MockClock>, vault: Arc<HandleVault>) -> Self {
        Self::with_chain(clock, vault, MOCK_CHAIN_ID, true)
    }

    /// Create a ledger reporting a specific chain id and code presence, for
    /// bootstrap failure tests.
    pub fn with_chain(
        clock: Arc<MockClock>,
        vault: Arc<HandleVault>,
        chain_id: u64,
        has_code: bool,
    ) -> Self {
        Self {
            clock,
            vault,
            chain_id,
            has_code,
            fail_status_query: std::sync::atomic::AtomicBool::new(false),
            inner: Mutex::new(LedgerInner {
                next_id: 1,
                tx_seq: 0,
                caller: PartyId::new("0xemployer"),
                records: HashMap::new(),
                listeners: Vec::new(),
                transactions: Vec::new(),
                injected_failures: VecDeque::new(),
            }),
        }
    }

    /// Identity used as the transaction sender for subsequent operations.
    pub fn set_caller(&self, party: PartyId) {
        self.inner.lock().caller = party;
    }

    /// Queue an error to be returned by the next transaction-sending
    /// operation instead of executing it.
    pub fn inject_failure(&self, error: ParleyError) {
        self.inner.lock().injected_failures.push_back(error);
    }

    /// Record a relayer-callback failure for `id` without emitting an event.
    /// Exercises the sweep path of the synchronization layer.
    pub fn set_callback_error(&self, id: NegotiationId, reason: impl Into<String>) {
        if let Some(record) = self.inner.lock().records.get_mut(&id) {
            record.callback_error = Some(reason.into());
        }
    }

    /// Blank the stored handle pair while leaving the state untouched,
    /// simulating a match that never actually computed.
    pub fn clear_handles(&self, id: NegotiationId) {
        if let Some(record) = self.inner.lock().records.get_mut(&id) {
            record.negotiation.has_match_handle = None;
            record.negotiation.meeting_point_handle = None;
        }
    }

    /// Override the public-decryption markers for `id`.
    pub fn set_marked(&self, id: NegotiationId, marked: bool) {
        if let Some(record) = self.inner.lock().records.get_mut(&id) {
            record.marked = marked;
        }
    }

    /// Make the next handle-status query fail, exercising the best-effort
    /// markability diagnostic.
    pub fn fail_next_status_query(&self) {
        self.fail_status_query
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Names of every transaction operation attempted so far.
    pub fn transactions(&self) -> Vec<String> {
        self.inner.lock().transactions.clone()
    }

    /// Number of transaction operations attempted so far.
    pub fn transaction_count(&self) -> usize {
        self.inner.lock().transactions.len()
    }

    /// Number of live event listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn next_tx(inner: &mut LedgerInner, op: &str) -> ParleyResult<TxRef> {
        if let Some(error) = inner.injected_failures.pop_front() {
            return Err(error);
        }
        inner.tx_seq += 1;
        inner.transactions.push(op.to_string());
        Ok(TxRef::new(format!("0x{:064x}", inner.tx_seq)))
    }

    fn emit(inner: &mut LedgerInner, event: LedgerEvent) {
        inner
            .listeners
            .retain(|listener| listener.try_send(event.clone()).is_ok());
    }

    fn record_mut<'a>(
        inner: &'a mut LedgerInner,
        id: NegotiationId,
    ) -> ParleyResult<&'a mut Record> {
        inner
            .records
            .get_mut(&id)
            .ok_or_else(|| ParleyError::ledger_rejected(format!("unknown negotiation {id}")))
    }

    fn decode_bound(enc: &EncryptedValue) -> ParleyResult<u64> {
        let bytes: [u8; 8] = enc
            .0
            .as_slice()
            .try_into()
            .map_err(|_| ParleyError::ledger_rejected("ciphertext rejected by verifier"))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn handle_for(id: NegotiationId, tag: u8) -> ValueHandle {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&id.value().to_le_bytes());
        bytes[31] = tag;
        ValueHandle::from_bytes(bytes)
    }

    async fn expired(&self, negotiation: &Negotiation) -> bool {
        use parley_core::effects::TimeEffects;
        self.clock.now_secs().await >= negotiation.deadline
    }
}

#[async_trait]
impl LedgerEffects for MockLedger {
    async fn create_negotiation(
        &self,
        candidate: &PartyId,
        title: &str,
        deadline_secs: u64,
    ) -> ParleyResult<CreatedNegotiation> {
        use parley_core::effects::TimeEffects;
        let now = self.clock.now_secs().await;
        let mut inner = self.inner.lock();
        let tx = Self::next_tx(&mut inner, "createNegotiation")?;
        let id = NegotiationId(inner.next_id);
        inner.next_id += 1;
        let employer = inner.caller.clone();
        let negotiation = Negotiation {
            id,
            employer: employer.clone(),
            candidate: candidate.clone(),
            title: title.to_string(),
            created_at: now,
            deadline: now + deadline_secs,
            state: NegotiationState::NotStarted,
            has_match_handle: None,
            meeting_point_handle: None,
            has_match_result: false,
            meeting_point: 0,
            match_revealed: false,
        };
        inner.records.insert(
            id,
            Record {
                negotiation,
                employer_range: None,
                candidate_range: None,
                marked: false,
                callback_error: None,
            },
        );
        Self::emit(
            &mut inner,
            LedgerEvent::Created {
                id,
                employer,
                candidate: candidate.clone(),
            },
        );
        Ok(CreatedNegotiation { id, tx })
    }

    async fn submit_employer_range(
        &self,
        id: NegotiationId,
        enc_min: &EncryptedValue,
        enc_max: &EncryptedValue,
        proof: &RangeProof,
    ) -> ParleyResult<TxRef> {
        let _ = proof;
        let snapshot = {
            let inner = self.inner.lock();
            match inner.records.get(&id) {
                Some(record) => record.negotiation.clone(),
                None => return Err(ParleyError::ledger_rejected(format!("unknown negotiation {id}"))),
            }
        };
        let expired = self.expired(&snapshot).await;
        let mut inner = self.inner.lock();
        let tx = Self::next_tx(&mut inner, "submitEmployerRange")?;
        if expired {
            return Err(ParleyError::ledger_rejected("negotiation expired"));
        }
        let min = Self::decode_bound(enc_min)?;
        let max = Self::decode_bound(enc_max)?;
        let record = Self::record_mut(&mut inner, id)?;
        if record.negotiation.state != NegotiationState::NotStarted {
            return Err(ParleyError::ledger_rejected(
                "employer range already submitted",
            ));
        }
        record.employer_range = Some((min, max));
        record.negotiation.state = NegotiationState::EmployerSubmitted;
        Self::emit(&mut inner, LedgerEvent::EmployerSubmitted { id });
        Ok(tx)
    }

    async fn submit_candidate_range(
        &self,
        id: NegotiationId,
        enc_min: &EncryptedValue,
        enc_max: &EncryptedValue,
        proof: &RangeProof,
    ) -> ParleyResult<TxRef> {
        let _ = proof;
        let snapshot = {
            let inner = self.inner.lock();
            match inner.records.get(&id) {
                Some(record) => record.negotiation.clone(),
                None => return Err(ParleyError::ledger_rejected(format!("unknown negotiation {id}"))),
            }
        };
        let expired = self.expired(&snapshot).await;
        let mut inner = self.inner.lock();
        let tx = Self::next_tx(&mut inner, "submitCandidateRange")?;
        if expired {
            return Err(ParleyError::ledger_rejected("negotiation expired"));
        }
        let min = Self::decode_bound(enc_min)?;
        let max = Self::decode_bound(enc_max)?;
        let record = Self::record_mut(&mut inner, id)?;
        match record.negotiation.state {
            NegotiationState::EmployerSubmitted => {}
            NegotiationState::NotStarted => {
                return Err(ParleyError::ledger_rejected("employer range missing"))
            }
            _ => {
                return Err(ParleyError::ledger_rejected(
                    "candidate range already submitted",
                ))
            }
        }
        record.candidate_range = Some((min, max));
        record.negotiation.state = NegotiationState::CandidateSubmitted;
        Self::emit(&mut inner, LedgerEvent::CandidateSubmitted { id });
        Ok(tx)
    }

    async fn trigger_match(&self, id: NegotiationId) -> ParleyResult<TxRef> {
        let mut inner = self.inner.lock();
        let tx = Self::next_tx(&mut inner, "calculateMatch")?;
        let record = Self::record_mut(&mut inner, id)?;
        if record.negotiation.state != NegotiationState::CandidateSubmitted {
            return Err(ParleyError::ledger_rejected(format!(
                "match not computable in state {}",
                record.negotiation.state
            )));
        }
        let (emp_min, emp_max) = record
            .employer_range
            .ok_or_else(|| ParleyError::ledger_rejected("employer range missing"))?;
        let (cand_min, cand_max) = record
            .candidate_range
            .ok_or_else(|| ParleyError::ledger_rejected("candidate range missing"))?;

        let has_match = emp_min <= cand_max && cand_min <= emp_max;
        let meeting_point = if has_match {
            (emp_min.max(cand_min) + emp_max.min(cand_max)) / 2
        } else {
            0
        };

        let has_match_handle = Self::handle_for(id, 1);
        let meeting_point_handle = Self::handle_for(id, 2);
        record.negotiation.state = NegotiationState::MatchReady;
        record.negotiation.has_match_handle = Some(has_match_handle);
        record.negotiation.meeting_point_handle = Some(meeting_point_handle);
        record.marked = true;

        self.vault.store(has_match_handle, ClearValue::Bool(has_match));
        self.vault
            .store(meeting_point_handle, ClearValue::Uint(meeting_point));

        Self::emit(&mut inner, LedgerEvent::MatchStarted { id });
        Ok(tx)
    }

    async fn reveal_match(
        &self,
        id: NegotiationId,
        has_match: bool,
        meeting_point: u64,
    ) -> ParleyResult<TxRef> {
        let mut inner = self.inner.lock();
        let tx = Self::next_tx(&mut inner, "revealMatch")?;
        let record = Self::record_mut(&mut inner, id)?;
        match record.negotiation.state {
            NegotiationState::MatchReady => {}
            NegotiationState::Completed => {
                return Err(ParleyError::ledger_rejected("match already revealed"))
            }
            other => {
                return Err(ParleyError::ledger_rejected(format!(
                    "match not ready in state {other}"
                )))
            }
        }
        record.negotiation.state = NegotiationState::Completed;
        record.negotiation.has_match_result = has_match;
        record.negotiation.meeting_point = meeting_point;
        record.negotiation.match_revealed = true;
        record.negotiation.has_match_handle = None;
        record.negotiation.meeting_point_handle = None;
        Self::emit(
            &mut inner,
            LedgerEvent::MatchRevealed {
                id,
                outcome: MatchOutcome {
                    has_match,
                    meeting_point,
                },
            },
        );
        Ok(tx)
    }

    async fn read_negotiation(&self, id: NegotiationId) -> ParleyResult<Negotiation> {
        let inner = self.inner.lock();
        inner
            .records
            .get(&id)
            .map(|record| record.negotiation.clone())
            .ok_or_else(|| ParleyError::ledger_rejected(format!("unknown negotiation {id}")))
    }

    async fn is_expired(&self, id: NegotiationId) -> ParleyResult<bool> {
        let negotiation = self.read_negotiation(id).await?;
        Ok(self.expired(&negotiation).await)
    }

    async fn match_handles(&self, id: NegotiationId) -> ParleyResult<MatchHandles> {
        let negotiation = self.read_negotiation(id).await?;
        Ok(negotiation.match_handles().unwrap_or(MatchHandles {
            has_match: ValueHandle::EMPTY,
            meeting_point: ValueHandle::EMPTY,
        }))
    }

    async fn match_handles_with_status(
        &self,
        id: NegotiationId,
    ) -> ParleyResult<MatchHandleStatus> {
        if self
            .fail_status_query
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(ParleyError::network("status query timed out"));
        }
        let handles = self.match_handles(id).await?;
        let marked = {
            let inner = self.inner.lock();
            inner.records.get(&id).map(|r| r.marked).unwrap_or(false)
        };
        let marked = marked && handles.both_present();
        Ok(MatchHandleStatus {
            handles,
            has_match_marked: marked,
            meeting_point_marked: marked,
        })
    }

    async fn user_negotiations(&self, party: &PartyId) -> ParleyResult<Vec<NegotiationId>> {
        let inner = self.inner.lock();
        let mut ids: Vec<NegotiationId> = inner
            .records
            .values()
            .filter(|record| {
                record.negotiation.employer == *party || record.negotiation.candidate == *party
            })
            .map(|record| record.negotiation.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn callback_debug_info(&self, id: NegotiationId) -> ParleyResult<Option<String>> {
        let inner = self.inner.lock();
        inner
            .records
            .get(&id)
            .map(|record| record.callback_error.clone())
            .ok_or_else(|| ParleyError::ledger_rejected(format!("unknown negotiation {id}")))
    }

    async fn chain_id(&self) -> ParleyResult<u64> {
        Ok(self.chain_id)
    }

    async fn has_contract_code(&self) -> ParleyResult<bool> {
        Ok(self.has_code)
    }

    async fn subscribe_events(&self) -> ParleyResult<mpsc::Receiver<LedgerEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.inner.lock().listeners.push(tx);
        Ok(rx)
    }

    fn clear_event_listeners(&self) {
        self.inner.lock().listeners.clear();
    }
}
