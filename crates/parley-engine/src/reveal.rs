//! The decrypt-and-reveal protocol.
//!
//! Once the encrypted match computation has run, the result exists only as
//! two ledger-held handles. Publishing the cleartext takes three external
//! parties in sequence: the ledger (handles), the gateway (decryption, with
//! human-timescale latency), and the ledger again (the reveal transaction).
//!
//! The gateway step retries transient unavailability on a fixed interval up
//! to a bounded budget. Everything else fails fast: empty handles mean the
//! match was never computed, an unmarked handle means a ledger-side
//! precondition is missing and waiting cannot fix it, and an unexpected
//! result shape is a contract violation to surface, not to guess around.

use std::sync::Arc;

use parley_core::effects::{DecryptedValues, GatewayEffects, LedgerEffects, TimeEffects};
use parley_core::{
    MatchHandles, MatchOutcome, NegotiationId, ParleyError, ParleyResult, TxRef,
};
use tracing::{debug, info, warn};

use crate::config::RevealRetryPolicy;
use crate::progress::ProgressReporter;

/// One reveal operation for one negotiation.
///
/// Scoped to a single call; the attempt counter and progress channel are
/// never shared across negotiations.
pub struct RevealFlow {
    ledger: Arc<dyn LedgerEffects>,
    gateway: Arc<dyn GatewayEffects>,
    clock: Arc<dyn TimeEffects>,
    policy: RevealRetryPolicy,
    progress: ProgressReporter,
}

impl RevealFlow {
    /// Assemble a flow over the given collaborators.
    pub fn new(
        ledger: Arc<dyn LedgerEffects>,
        gateway: Arc<dyn GatewayEffects>,
        clock: Arc<dyn TimeEffects>,
        policy: RevealRetryPolicy,
        progress: ProgressReporter,
    ) -> Self {
        Self {
            ledger,
            gateway,
            clock,
            policy,
            progress,
        }
    }

    /// Run the full protocol: fetch handles, verify markability, decrypt
    /// with bounded retry, submit the reveal transaction.
    pub async fn run(&self, id: NegotiationId) -> ParleyResult<TxRef> {
        self.progress.set("Getting encrypted handles...");
        let handles = self.ledger.match_handles(id).await?;
        if handles.has_match.is_empty() {
            return Err(ParleyError::invalid_handles(
                "has-match handle is empty; match was not computed",
            ));
        }
        if handles.meeting_point.is_empty() {
            return Err(ParleyError::invalid_handles(
                "meeting-point handle is empty; match was not computed",
            ));
        }

        // Best-effort diagnostic: a failed status query is logged and
        // ignored, but a definitive "not marked" answer is a hard stop -
        // waiting cannot mark a handle.
        self.progress.set("Verifying decryption status...");
        match self.ledger.match_handles_with_status(id).await {
            Ok(status) if !status.has_match_marked => {
                return Err(ParleyError::not_marked(
                    "has-match handle is not marked for public decryption",
                ));
            }
            Ok(status) if !status.meeting_point_marked => {
                return Err(ParleyError::not_marked(
                    "meeting-point handle is not marked for public decryption",
                ));
            }
            Ok(_) => debug!(%id, "both handles marked for public decryption"),
            Err(error) => {
                warn!(%id, %error, "markability check failed, continuing with decryption");
            }
        }

        let outcome = self.decrypt_with_retry(&handles).await?;

        self.progress.set("Submitting reveal transaction...");
        let tx = self
            .ledger
            .reveal_match(id, outcome.has_match, outcome.meeting_point)
            .await?;
        info!(%id, has_match = outcome.has_match, "match revealed");
        self.progress.set("Success!");
        Ok(tx)
    }

    /// Call the gateway until it yields cleartexts, consuming only
    /// transient failures and at most `max_attempts` calls.
    async fn decrypt_with_retry(&self, handles: &MatchHandles) -> ParleyResult<MatchOutcome> {
        let request = [handles.has_match, handles.meeting_point];
        let max = self.policy.max_attempts;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.progress
                .set(format!("Decrypting... (attempt {attempt}/{max})"));
            match self.gateway.public_decrypt(&request).await {
                Ok(values) => return extract_outcome(handles, &values),
                Err(error) if error.is_transient() && attempt < max => {
                    let wait_secs = self.policy.retry_delay_ms / 1000;
                    debug!(attempt, %error, "decryption not ready, waiting");
                    self.progress.set(format!(
                        "Decryption not ready yet. Waiting {wait_secs}s before retry {}...",
                        attempt + 1
                    ));
                    self.clock.sleep_ms(self.policy.retry_delay_ms).await;
                }
                Err(error) if error.is_transient() => {
                    return Err(ParleyError::DecryptionTimeout { attempts: attempt });
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Pull exactly the two expected cleartexts out of a decryption result.
fn extract_outcome(
    handles: &MatchHandles,
    values: &DecryptedValues,
) -> ParleyResult<MatchOutcome> {
    if values.len() != 2 {
        return Err(ParleyError::malformed_result(format!(
            "expected 2 cleartexts, gateway returned {}",
            values.len()
        )));
    }
    let has_match = values
        .value(&handles.has_match)
        .ok_or_else(|| ParleyError::malformed_result("result is missing the has-match cleartext"))?
        .as_bool()?;
    let meeting_point = values
        .value(&handles.meeting_point)
        .ok_or_else(|| {
            ParleyError::malformed_result("result is missing the meeting-point cleartext")
        })?
        .as_u64()?;
    Ok(MatchOutcome {
        has_match,
        meeting_point,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::effects::ClearValue;
    use parley_core::ValueHandle;

    fn handles() -> MatchHandles {
        MatchHandles {
            has_match: ValueHandle::from_bytes([1u8; 32]),
            meeting_point: ValueHandle::from_bytes([2u8; 32]),
        }
    }

    #[test]
    fn extracts_pair_in_declared_order() {
        let h = handles();
        let values = DecryptedValues::from_entries([
            (h.has_match, ClearValue::Bool(true)),
            (h.meeting_point, ClearValue::Uint(35_000)),
        ]);
        let outcome = extract_outcome(&h, &values).expect("well-formed");
        assert!(outcome.has_match);
        assert_eq!(outcome.meeting_point, 35_000);
    }

    #[test]
    fn rejects_wrong_entry_count() {
        let h = handles();
        let short = DecryptedValues::from_entries([(h.has_match, ClearValue::Bool(true))]);
        assert!(matches!(
            extract_outcome(&h, &short),
            Err(ParleyError::MalformedDecryptionResult { .. })
        ));
    }

    #[test]
    fn rejects_foreign_handles() {
        let h = handles();
        let foreign = DecryptedValues::from_entries([
            (ValueHandle::from_bytes([7u8; 32]), ClearValue::Bool(true)),
            (ValueHandle::from_bytes([8u8; 32]), ClearValue::Uint(1)),
        ]);
        assert!(matches!(
            extract_outcome(&h, &foreign),
            Err(ParleyError::MalformedDecryptionResult { .. })
        ));
    }

    #[test]
    fn rejects_swapped_cleartext_types() {
        let h = handles();
        let swapped = DecryptedValues::from_entries([
            (h.has_match, ClearValue::Uint(1)),
            (h.meeting_point, ClearValue::Bool(true)),
        ]);
        assert!(matches!(
            extract_outcome(&h, &swapped),
            Err(ParleyError::MalformedDecryptionResult { .. })
        ));
    }
}
