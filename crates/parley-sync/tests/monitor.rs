//! Monitor behavior: loading placeholder, event-driven and sweep-driven
//! refresh, idempotent re-fetch, and listener teardown.

use std::sync::Arc;
use std::time::Duration;

use parley_core::effects::LedgerEffects;
use parley_core::{EncryptedValue, NegotiationId, PartyId, RangeProof};
use parley_sync::{MonitorConfig, NegotiationMonitor, NegotiationSnapshot};
use parley_testkit::TestHarness;
use tokio::sync::watch;

fn enc(value: u64) -> EncryptedValue {
    EncryptedValue(value.to_le_bytes().to_vec())
}

fn proof() -> RangeProof {
    RangeProof(b"proof".to_vec())
}

/// Sweep long enough to stay out of the way unless a test wants it.
fn quiet_config() -> MonitorConfig {
    MonitorConfig {
        sweep_interval: Duration::from_secs(3_600),
        ..MonitorConfig::default()
    }
}

async fn wait_for(
    rx: &mut watch::Receiver<NegotiationSnapshot>,
    what: &str,
    predicate: impl Fn(&NegotiationSnapshot) -> bool,
) -> NegotiationSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("monitor alive");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

async fn created(harness: &TestHarness) -> NegotiationId {
    harness
        .ledger
        .create_negotiation(&PartyId::new("0xcandidate"), "role", 86_400)
        .await
        .expect("create")
        .id
}

#[tokio::test]
async fn watch_starts_loading_then_resolves() {
    let harness = TestHarness::new();
    let id = created(&harness).await;
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");

    let mut rx = monitor.watch(id);
    assert!(rx.borrow().is_loading());

    let snapshot = wait_for(&mut rx, "first fetch", |s| !s.is_loading()).await;
    assert_eq!(snapshot.id(), id);
    assert_eq!(
        snapshot.negotiation().expect("ready").candidate,
        PartyId::new("0xCANDIDATE")
    );
    monitor.shutdown();
}

#[tokio::test]
async fn ledger_events_drive_refresh() {
    let harness = TestHarness::new();
    let id = created(&harness).await;
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");

    let mut rx = monitor.watch(id);
    wait_for(&mut rx, "first fetch", |s| !s.is_loading()).await;

    harness
        .ledger
        .submit_employer_range(id, &enc(1_000), &enc(2_000), &proof())
        .await
        .expect("submit");

    use parley_core::NegotiationState;
    let snapshot = wait_for(&mut rx, "event-driven update", |s| {
        s.state() == Some(NegotiationState::EmployerSubmitted)
    })
    .await;
    assert!(!snapshot.is_loading());
    monitor.shutdown();
}

#[tokio::test]
async fn sweep_catches_changes_that_emitted_no_event() {
    let harness = TestHarness::new();
    let id = created(&harness).await;
    let config = MonitorConfig {
        sweep_interval: Duration::from_millis(50),
        ..MonitorConfig::default()
    };
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, config)
        .await
        .expect("start");

    let mut rx = monitor.watch(id);
    wait_for(&mut rx, "first fetch", |s| !s.is_loading()).await;

    // A callback failure is recorded on the ledger without any event; only
    // the periodic sweep can surface it.
    harness
        .ledger
        .set_callback_error(id, "relayer callback reverted");

    let snapshot = wait_for(&mut rx, "sweep-driven update", |s| {
        matches!(
            s,
            NegotiationSnapshot::Ready { last_error: Some(_), .. }
        )
    })
    .await;
    match snapshot {
        NegotiationSnapshot::Ready { last_error, .. } => {
            assert_eq!(last_error.as_deref(), Some("relayer callback reverted"));
        }
        NegotiationSnapshot::Loading { .. } => unreachable!("matched Ready above"),
    }
    monitor.shutdown();
}

#[tokio::test]
async fn refresh_is_idempotent_without_ledger_changes() {
    let harness = TestHarness::new();
    let id = created(&harness).await;
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");

    let mut rx = monitor.watch(id);
    wait_for(&mut rx, "first fetch", |s| !s.is_loading()).await;

    monitor.refresh(id).await;
    let first = rx.borrow_and_update().clone();
    monitor.refresh(id).await;
    let second = rx.borrow_and_update().clone();
    assert_eq!(first, second);
    monitor.shutdown();
}

#[tokio::test]
async fn failed_refresh_keeps_the_previous_snapshot() {
    let harness = TestHarness::new();
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");

    // Nothing with this id exists on the ledger; the fetch fails and the
    // placeholder stays.
    let ghost = NegotiationId(999);
    let rx = monitor.watch(ghost);
    monitor.refresh(ghost).await;
    assert!(rx.borrow().is_loading());
    monitor.shutdown();
}

#[tokio::test]
async fn watch_user_covers_both_sides() {
    let harness = TestHarness::new();
    let employer = PartyId::new("0xemployer");
    let first = created(&harness).await;
    let second = created(&harness).await;
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");

    let ids = monitor.watch_user(&employer).await.expect("lookup");
    assert_eq!(ids, vec![first, second]);
    assert_eq!(monitor.watched_count(), 2);

    let ids = monitor
        .watch_user(&PartyId::new("0xCandidate"))
        .await
        .expect("case-insensitive lookup");
    assert_eq!(ids.len(), 2);
    monitor.shutdown();
}

#[tokio::test]
async fn releasing_the_last_watcher_tears_down_listeners() {
    let harness = TestHarness::new();
    let first = created(&harness).await;
    let second = created(&harness).await;
    let monitor = NegotiationMonitor::start(Arc::clone(&harness.ledger) as _, quiet_config())
        .await
        .expect("start");
    assert_eq!(harness.ledger.listener_count(), 1);

    let _rx1 = monitor.watch(first);
    let _rx2 = monitor.watch(second);

    monitor.unwatch(first);
    assert_eq!(harness.ledger.listener_count(), 1);

    monitor.unwatch(second);
    assert_eq!(monitor.watched_count(), 0);
    assert_eq!(harness.ledger.listener_count(), 0);
    monitor.shutdown();
}
