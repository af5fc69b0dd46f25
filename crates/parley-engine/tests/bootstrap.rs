//! Gateway bootstrap: single-flight initialization and fatal checks.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use parley_core::effects::{LedgerEffects, SdkRuntime, TimeEffects};
use parley_core::{ParleyError, PartyId, Role};
use parley_engine::NegotiationService;
use parley_testkit::{HandleVault, MockClock, MockGateway, MockLedger, MockSdk, TestHarness, MOCK_CHAIN_ID};

#[tokio::test]
async fn concurrent_callers_share_one_bootstrap_attempt() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    // Two failed probes force the initializer to suspend, giving the other
    // callers a chance to pile up behind it.
    harness.sdk.ready_after_probes(2);

    let (a, b, c) = tokio::join!(
        service.ensure_ready(),
        service.ensure_ready(),
        service.ensure_ready()
    );
    a.expect("first caller");
    b.expect("second caller");
    c.expect("third caller");

    assert_eq!(harness.sdk.init_calls(), 1);
    assert_eq!(harness.sdk.instances_created(), 1);
}

#[tokio::test]
async fn readiness_polling_backs_off_exponentially() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    harness.sdk.ready_after_probes(4);

    service.ensure_ready().await.expect("eventually ready");

    assert_eq!(harness.sdk.probe_count(), 5);
    assert_eq!(harness.clock.recorded_sleeps(), vec![100, 200, 400, 800]);
}

#[tokio::test]
async fn gives_up_after_twelve_probes_then_allows_a_fresh_attempt() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    harness.sdk.ready_after_probes(u32::MAX);

    let err = service.ensure_ready().await.expect_err("SDK never loads");
    assert_matches!(err, ParleyError::NotInitialized { .. });
    assert_eq!(harness.sdk.probe_count(), 12);
    assert_eq!(harness.sdk.init_calls(), 0);

    // Doubling from 100ms, capped at 5s, eleven waits between twelve probes.
    assert_eq!(
        harness.clock.recorded_sleeps(),
        vec![100, 200, 400, 800, 1_600, 3_200, 5_000, 5_000, 5_000, 5_000, 5_000]
    );

    // A failed attempt caches nothing; the next call starts over.
    harness.sdk.ready_after_probes(0);
    service.ensure_ready().await.expect("fresh attempt");
    assert_eq!(harness.sdk.init_calls(), 1);
}

#[tokio::test]
async fn wrong_chain_is_a_fatal_bootstrap_error() {
    let clock = MockClock::new(1_700_000_000);
    let vault = HandleVault::new();
    let ledger = Arc::new(MockLedger::with_chain(
        Arc::clone(&clock),
        Arc::clone(&vault),
        1,
        true,
    ));
    let gateway = Arc::new(MockGateway::new(vault));
    let sdk = Arc::new(MockSdk::new(gateway));

    let service = NegotiationService::new(
        ledger as Arc<dyn LedgerEffects>,
        sdk as Arc<dyn SdkRuntime>,
        clock as Arc<dyn TimeEffects>,
        common::config(),
    );
    let err = service.ensure_ready().await.expect_err("wrong chain");
    assert_matches!(err, ParleyError::NetworkError { .. });
}

#[tokio::test]
async fn missing_contract_code_is_a_fatal_bootstrap_error() {
    let clock = MockClock::new(1_700_000_000);
    let vault = HandleVault::new();
    let ledger = Arc::new(MockLedger::with_chain(
        Arc::clone(&clock),
        Arc::clone(&vault),
        MOCK_CHAIN_ID,
        false,
    ));
    let gateway = Arc::new(MockGateway::new(vault));
    let sdk = Arc::new(MockSdk::new(gateway));

    let service = NegotiationService::new(
        ledger as Arc<dyn LedgerEffects>,
        sdk as Arc<dyn SdkRuntime>,
        clock as Arc<dyn TimeEffects>,
        common::config(),
    );
    let err = service.ensure_ready().await.expect_err("no code");
    assert_matches!(err, ParleyError::InvalidInput { .. });
}

#[tokio::test]
async fn uninitialized_gateway_rejects_encryption() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");

    harness.gateway.set_ready(false);
    let err = service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect_err("primitive not ready");
    assert_matches!(err, ParleyError::NotInitialized { .. });
}
