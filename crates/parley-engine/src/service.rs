//! The orchestrator facade.
//!
//! [`NegotiationService`] is the one entry point presentation layers call.
//! It owns the ledger handle, the gateway bootstrap, and the per-negotiation
//! reveal single-flight set. It holds no negotiation state of its own -
//! every operation validates against a freshly-read ledger snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use parley_core::effects::{GatewayConfig, LedgerEffects, SdkRuntime, TimeEffects};
use parley_core::{
    CreatedNegotiation, MatchOutcome, Negotiation, NegotiationId, NegotiationState, ParleyError,
    ParleyResult, PartyId, Role, TxRef,
};

use crate::bootstrap::GatewayBootstrap;
use crate::config::{BootstrapPolicy, RevealRetryPolicy};
use crate::progress::ProgressReporter;
use crate::reveal::RevealFlow;

type RevealSlots = Mutex<HashMap<NegotiationId, watch::Sender<String>>>;

/// Client-side orchestrator for one negotiation contract.
pub struct NegotiationService {
    ledger: Arc<dyn LedgerEffects>,
    clock: Arc<dyn TimeEffects>,
    bootstrap: GatewayBootstrap,
    retry: RevealRetryPolicy,
    in_flight: RevealSlots,
}

impl NegotiationService {
    /// Create a service with default retry and bootstrap policies.
    pub fn new(
        ledger: Arc<dyn LedgerEffects>,
        sdk: Arc<dyn SdkRuntime>,
        clock: Arc<dyn TimeEffects>,
        config: GatewayConfig,
    ) -> Self {
        Self::with_policies(
            ledger,
            sdk,
            clock,
            config,
            BootstrapPolicy::default(),
            RevealRetryPolicy::default(),
        )
    }

    /// Create a service with explicit policies. Tests shrink the delays;
    /// production keeps the defaults.
    pub fn with_policies(
        ledger: Arc<dyn LedgerEffects>,
        sdk: Arc<dyn SdkRuntime>,
        clock: Arc<dyn TimeEffects>,
        config: GatewayConfig,
        bootstrap_policy: BootstrapPolicy,
        retry: RevealRetryPolicy,
    ) -> Self {
        let bootstrap = GatewayBootstrap::new(
            sdk,
            Arc::clone(&ledger),
            Arc::clone(&clock),
            config,
            bootstrap_policy,
        );
        Self {
            ledger,
            clock,
            bootstrap,
            retry,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Eagerly run the gateway bootstrap. Optional - every operation that
    /// needs the gateway triggers it on demand.
    pub async fn ensure_ready(&self) -> ParleyResult<()> {
        self.bootstrap.instance().await.map(|_| ())
    }

    /// Create a negotiation inviting `candidate`, expiring after
    /// `deadline_secs`.
    pub async fn create_negotiation(
        &self,
        candidate: &PartyId,
        title: &str,
        deadline_secs: u64,
    ) -> ParleyResult<CreatedNegotiation> {
        if deadline_secs == 0 {
            return Err(ParleyError::invalid("deadline must lie in the future"));
        }
        let created = self
            .ledger
            .create_negotiation(candidate, title, deadline_secs)
            .await?;
        info!(id = %created.id, %candidate, "negotiation created");
        Ok(created)
    }

    /// Encrypt and submit one party's salary range.
    ///
    /// Local checks (range order, party/role, phase, expiry) reject before
    /// any ciphertext is produced or transaction sent. Ledger failures
    /// propagate verbatim - resubmission is the caller's decision, because
    /// an automatic retry risks a duplicate-range rejection.
    pub async fn submit_range(
        &self,
        role: Role,
        id: NegotiationId,
        min: u64,
        max: u64,
        party: &PartyId,
    ) -> ParleyResult<TxRef> {
        if min > max {
            return Err(ParleyError::invalid(format!(
                "range lower bound {min} exceeds upper bound {max}"
            )));
        }

        let negotiation = self.ledger.read_negotiation(id).await?;
        match negotiation.role_of(party) {
            Some(actual) if actual == role => {}
            Some(actual) => {
                return Err(ParleyError::invalid(format!(
                    "{party} is the {actual} of negotiation {id}, not the {role}"
                )))
            }
            None => {
                return Err(ParleyError::invalid(format!(
                    "{party} is not a party to negotiation {id}"
                )))
            }
        }
        let required = role.submission_state();
        if negotiation.state != required {
            return Err(ParleyError::invalid(format!(
                "{role} range cannot be submitted in state \"{}\"",
                negotiation.state
            )));
        }
        if self.ledger.is_expired(id).await? {
            return Err(ParleyError::invalid(format!(
                "negotiation {id} has expired"
            )));
        }

        let gateway = self.bootstrap.instance().await?;
        let encrypted = gateway
            .encrypt_range(min, max, party, &self.bootstrap.config().contract)
            .await?;
        debug!(%id, %role, "range encrypted, submitting");

        let tx = match role {
            Role::Employer => {
                self.ledger
                    .submit_employer_range(id, &encrypted.enc_min, &encrypted.enc_max, &encrypted.proof)
                    .await?
            }
            Role::Candidate => {
                self.ledger
                    .submit_candidate_range(id, &encrypted.enc_min, &encrypted.enc_max, &encrypted.proof)
                    .await?
            }
        };
        info!(%id, %role, tx = %tx, "range submitted");
        Ok(tx)
    }

    /// Request the encrypted match computation once both ranges are stored.
    ///
    /// Not retried: a failure is reported to the caller, and repeating the
    /// call once the negotiation is already at `MatchReady` is rejected by
    /// the ledger rather than re-run.
    pub async fn trigger_match(&self, id: NegotiationId) -> ParleyResult<TxRef> {
        let negotiation = self.ledger.read_negotiation(id).await?;
        if negotiation.state != NegotiationState::CandidateSubmitted {
            return Err(ParleyError::invalid(format!(
                "match requires both ranges; negotiation {id} is at \"{}\"",
                negotiation.state
            )));
        }
        let tx = self.ledger.trigger_match(id).await?;
        info!(%id, tx = %tx, "match computation triggered");
        Ok(tx)
    }

    /// Decrypt the computed match via the gateway and publish the result.
    ///
    /// Single-flight per negotiation: a second call while one is in
    /// progress is rejected, not queued. Transient gateway unavailability
    /// is retried internally up to the configured budget.
    pub async fn reveal_match(&self, id: NegotiationId) -> ParleyResult<TxRef> {
        let (reporter, _slot) = self.acquire_reveal_slot(id)?;

        let negotiation = self.ledger.read_negotiation(id).await?;
        if negotiation.state != NegotiationState::MatchReady {
            return Err(ParleyError::invalid(format!(
                "nothing to reveal: negotiation {id} is at \"{}\"",
                negotiation.state
            )));
        }

        let gateway = self.bootstrap.instance().await?;
        let flow = RevealFlow::new(
            Arc::clone(&self.ledger),
            gateway,
            Arc::clone(&self.clock),
            self.retry,
            reporter,
        );
        let tx = flow.run(id).await?;

        // Ledger is the source of truth for result fields: re-read instead
        // of trusting the locally decrypted values.
        let refreshed = self.ledger.read_negotiation(id).await?;
        debug!(%id, state = %refreshed.state, "post-reveal snapshot");
        Ok(tx)
    }

    /// Progress channel of an in-flight reveal, if one is running for `id`.
    pub fn reveal_progress(&self, id: NegotiationId) -> Option<watch::Receiver<String>> {
        self.in_flight.lock().get(&id).map(watch::Sender::subscribe)
    }

    /// Read the current negotiation snapshot.
    pub async fn negotiation(&self, id: NegotiationId) -> ParleyResult<Negotiation> {
        self.ledger.read_negotiation(id).await
    }

    /// All negotiations `party` participates in.
    pub async fn user_negotiations(&self, party: &PartyId) -> ParleyResult<Vec<NegotiationId>> {
        self.ledger.user_negotiations(party).await
    }

    /// The revealed outcome of a completed negotiation.
    pub async fn match_result(&self, id: NegotiationId) -> ParleyResult<MatchOutcome> {
        let negotiation = self.ledger.read_negotiation(id).await?;
        negotiation.outcome().ok_or_else(|| {
            ParleyError::invalid(format!(
                "negotiation {id} has no revealed result (state \"{}\")",
                negotiation.state
            ))
        })
    }

    fn acquire_reveal_slot(
        &self,
        id: NegotiationId,
    ) -> ParleyResult<(ProgressReporter, RevealSlot<'_>)> {
        let mut slots = self.in_flight.lock();
        if slots.contains_key(&id) {
            return Err(ParleyError::invalid(format!(
                "a reveal is already in progress for negotiation {id}"
            )));
        }
        let (tx, _rx) = watch::channel(String::from("Initializing..."));
        let reporter = ProgressReporter::from_sender(tx.clone());
        slots.insert(id, tx);
        Ok((
            reporter,
            RevealSlot {
                slots: &self.in_flight,
                id,
            },
        ))
    }
}

/// Releases a negotiation's reveal slot on every exit path.
struct RevealSlot<'a> {
    slots: &'a RevealSlots,
    id: NegotiationId,
}

impl Drop for RevealSlot<'_> {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.id);
    }
}
