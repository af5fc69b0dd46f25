//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parley_core::effects::{GatewayConfig, LedgerEffects, SdkRuntime, TimeEffects};
use parley_core::{ContractAddress, NegotiationId, PartyId, Role};
use parley_engine::{BootstrapPolicy, NegotiationService, RevealRetryPolicy};
use parley_testkit::{TestHarness, MOCK_CHAIN_ID};

pub const EMPLOYER: &str = "0xEmployer";
pub const CANDIDATE: &str = "0xCandidate";

pub fn config() -> GatewayConfig {
    GatewayConfig {
        chain_id: MOCK_CHAIN_ID,
        contract: ContractAddress::new("0x00000000000000000000000000000000c0ffee00"),
        gateway_url: "https://gateway.example.test".to_string(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn service(harness: &TestHarness) -> NegotiationService {
    init_tracing();
    NegotiationService::with_policies(
        Arc::clone(&harness.ledger) as Arc<dyn LedgerEffects>,
        Arc::clone(&harness.sdk) as Arc<dyn SdkRuntime>,
        Arc::clone(&harness.clock) as Arc<dyn TimeEffects>,
        config(),
        BootstrapPolicy::default(),
        RevealRetryPolicy::default(),
    )
}

/// Drive a fresh negotiation all the way to `MatchReady`.
pub async fn ready_negotiation(
    harness: &TestHarness,
    service: &NegotiationService,
) -> NegotiationId {
    let employer = PartyId::new(EMPLOYER);
    let candidate = PartyId::new(CANDIDATE);
    harness.ledger.set_caller(employer.clone());

    let created = service
        .create_negotiation(&candidate, "Senior Rust engineer", 86_400)
        .await
        .expect("create");
    service
        .submit_range(Role::Employer, created.id, 10_000, 100_000, &employer)
        .await
        .expect("employer range");
    service
        .submit_range(Role::Candidate, created.id, 20_000, 50_000, &candidate)
        .await
        .expect("candidate range");
    service
        .trigger_match(created.id)
        .await
        .expect("trigger match");
    created.id
}
