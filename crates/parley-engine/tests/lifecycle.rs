//! Negotiation lifecycle: submission gates, match trigger, and the
//! end-to-end pipeline.

mod common;

use assert_matches::assert_matches;
use parley_core::{NegotiationState, ParleyError, PartyId, Role};
use parley_testkit::TestHarness;

#[tokio::test]
async fn full_negotiation_reaches_agreement() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    let candidate = PartyId::new(common::CANDIDATE);
    harness.ledger.set_caller(employer.clone());

    let created = service
        .create_negotiation(&candidate, "Senior Rust engineer", 86_400)
        .await
        .expect("create");
    let mut states = vec![service.negotiation(created.id).await.expect("read").state];
    assert_eq!(states[0], NegotiationState::NotStarted);

    service
        .submit_range(Role::Employer, created.id, 10_000, 100_000, &employer)
        .await
        .expect("employer range");
    states.push(service.negotiation(created.id).await.expect("read").state);
    assert_eq!(states[1], NegotiationState::EmployerSubmitted);

    service
        .submit_range(Role::Candidate, created.id, 20_000, 50_000, &candidate)
        .await
        .expect("candidate range");
    states.push(service.negotiation(created.id).await.expect("read").state);
    assert_eq!(states[2], NegotiationState::CandidateSubmitted);

    service.trigger_match(created.id).await.expect("trigger");
    let ready = service.negotiation(created.id).await.expect("read");
    states.push(ready.state);
    assert_eq!(ready.state, NegotiationState::MatchReady);
    assert!(ready.match_handles().expect("handles").both_present());

    // A couple of "not ready yet" rounds from the gateway, then success.
    harness.gateway.fail_transient_times(2);
    service.reveal_match(created.id).await.expect("reveal");
    assert!(harness.gateway.decrypt_attempts() <= 20);

    let done = service.negotiation(created.id).await.expect("read");
    states.push(done.state);
    assert_eq!(done.state, NegotiationState::Completed);
    assert!(done.match_revealed);

    let outcome = service.match_result(created.id).await.expect("result");
    assert!(outcome.has_match);
    assert!((20_000..=50_000).contains(&outcome.meeting_point));

    // Observed states never went backwards.
    assert!(states.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn party_identity_comparison_ignores_case() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    harness.ledger.set_caller(PartyId::new("0xAbCd00"));
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");

    service
        .submit_range(
            Role::Employer,
            created.id,
            1_000,
            2_000,
            &PartyId::new("0XABCD00"),
        )
        .await
        .expect("same party, different rendering");
}

#[tokio::test]
async fn inverted_range_is_rejected_before_any_side_effect() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");
    let transactions_before = harness.ledger.transaction_count();

    let err = service
        .submit_range(Role::Employer, created.id, 50_000, 10_000, &employer)
        .await
        .expect_err("min > max");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    // No transaction was attempted, and the gateway was never even
    // bootstrapped.
    assert_eq!(harness.ledger.transaction_count(), transactions_before);
    assert_eq!(harness.sdk.instances_created(), 0);
}

#[tokio::test]
async fn second_submission_per_role_is_rejected() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    let candidate = PartyId::new(common::CANDIDATE);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&candidate, "role", 3_600)
        .await
        .expect("create");

    service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect("first employer range");
    let err = service
        .submit_range(Role::Employer, created.id, 1_500, 2_500, &employer)
        .await
        .expect_err("duplicate employer range");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    service
        .submit_range(Role::Candidate, created.id, 1_200, 1_800, &candidate)
        .await
        .expect("first candidate range");
    let err = service
        .submit_range(Role::Candidate, created.id, 1_200, 1_800, &candidate)
        .await
        .expect_err("duplicate candidate range");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    // Neither rejection reached the ledger.
    let negotiation = service.negotiation(created.id).await.expect("read");
    assert_eq!(negotiation.state, NegotiationState::CandidateSubmitted);
}

#[tokio::test]
async fn candidate_cannot_submit_before_employer() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let candidate = PartyId::new(common::CANDIDATE);
    harness.ledger.set_caller(PartyId::new(common::EMPLOYER));
    let created = service
        .create_negotiation(&candidate, "role", 3_600)
        .await
        .expect("create");

    let err = service
        .submit_range(Role::Candidate, created.id, 1_000, 2_000, &candidate)
        .await
        .expect_err("out of order");
    assert_matches!(err, ParleyError::InvalidInput { .. });
}

#[tokio::test]
async fn outsiders_cannot_submit() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    harness.ledger.set_caller(PartyId::new(common::EMPLOYER));
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");

    let err = service
        .submit_range(
            Role::Employer,
            created.id,
            1_000,
            2_000,
            &PartyId::new("0xSomebodyElse"),
        )
        .await
        .expect_err("not a party");
    assert_matches!(err, ParleyError::InvalidInput { .. });
}

#[tokio::test]
async fn trigger_requires_both_ranges_and_runs_once() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    let candidate = PartyId::new(common::CANDIDATE);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&candidate, "role", 3_600)
        .await
        .expect("create");

    let err = service.trigger_match(created.id).await.expect_err("empty");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect("employer range");
    let err = service
        .trigger_match(created.id)
        .await
        .expect_err("one range only");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    service
        .submit_range(Role::Candidate, created.id, 1_200, 1_800, &candidate)
        .await
        .expect("candidate range");
    service.trigger_match(created.id).await.expect("both present");

    // Repeating the trigger at MatchReady is an error, not a state change.
    let err = service
        .trigger_match(created.id)
        .await
        .expect_err("already computed");
    assert_matches!(err, ParleyError::InvalidInput { .. });
    let negotiation = service.negotiation(created.id).await.expect("read");
    assert_eq!(negotiation.state, NegotiationState::MatchReady);
}

#[tokio::test]
async fn expiry_blocks_submission_without_changing_state() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 100)
        .await
        .expect("create");

    harness.clock.advance_secs(200);
    let err = service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect_err("expired");
    assert_matches!(err, ParleyError::InvalidInput { .. });

    // Expiry is a predicate, not a transition.
    let negotiation = service.negotiation(created.id).await.expect("read");
    assert_eq!(negotiation.state, NegotiationState::NotStarted);
}

#[tokio::test]
async fn ledger_rejection_propagates_verbatim() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");

    harness
        .ledger
        .inject_failure(ParleyError::ledger_rejected("execution reverted: E01"));
    let err = service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect_err("reverted");
    assert_matches!(
        err,
        ParleyError::LedgerRejected { ref message } if message.contains("E01")
    );
}

#[tokio::test]
async fn handles_are_absent_before_match_ready() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let employer = PartyId::new(common::EMPLOYER);
    harness.ledger.set_caller(employer.clone());
    let created = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 3_600)
        .await
        .expect("create");
    service
        .submit_range(Role::Employer, created.id, 1_000, 2_000, &employer)
        .await
        .expect("employer range");

    let negotiation = service.negotiation(created.id).await.expect("read");
    assert!(negotiation.match_handles().is_none());

    use parley_core::effects::LedgerEffects;
    let handles = harness
        .ledger
        .match_handles(created.id)
        .await
        .expect("sentinel pair");
    assert!(handles.has_match.is_empty());
    assert!(handles.meeting_point.is_empty());
}

#[tokio::test]
async fn reveal_is_rejected_outside_match_ready() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let id = common::ready_negotiation(&harness, &service).await;

    service.reveal_match(id).await.expect("reveal");
    let err = service.reveal_match(id).await.expect_err("already done");
    assert_matches!(err, ParleyError::InvalidInput { .. });
}

#[tokio::test]
async fn zero_deadline_is_rejected() {
    let harness = TestHarness::new();
    let service = common::service(&harness);
    let err = service
        .create_negotiation(&PartyId::new(common::CANDIDATE), "role", 0)
        .await
        .expect_err("deadline in the past");
    assert_matches!(err, ParleyError::InvalidInput { .. });
}
