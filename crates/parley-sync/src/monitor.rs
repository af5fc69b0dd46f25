//! The negotiation monitor.
//!
//! One watch channel per watched negotiation id, fed by a single
//! serialized updater task. The updater's queue receives refresh hints
//! from two independent sources: the ledger event pump and the periodic
//! sweep. Both may race for the same id; the updater resolves races by
//! always replacing the full snapshot with its own fresh ledger read,
//! never by merging fields from different fetches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use parley_core::effects::LedgerEffects;
use parley_core::{NegotiationId, ParleyResult, PartyId};

use crate::snapshot::NegotiationSnapshot;
use crate::tasks::TaskRegistry;

/// Monitor tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Interval of the reconciliation sweep over all watched negotiations.
    pub sweep_interval: Duration,
    /// Capacity of the refresh-hint queue.
    pub refresh_queue_depth: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            refresh_queue_depth: 64,
        }
    }
}

/// Continuously-updated negotiation snapshots for any number of
/// subscribers.
pub struct NegotiationMonitor {
    inner: Arc<MonitorInner>,
    tasks: TaskRegistry,
    refresh_tx: mpsc::Sender<NegotiationId>,
}

struct MonitorInner {
    ledger: Arc<dyn LedgerEffects>,
    watchers: Mutex<HashMap<NegotiationId, watch::Sender<NegotiationSnapshot>>>,
}

impl NegotiationMonitor {
    /// Subscribe to ledger events and start the pump, sweep, and updater
    /// tasks.
    pub async fn start(
        ledger: Arc<dyn LedgerEffects>,
        config: MonitorConfig,
    ) -> ParleyResult<Self> {
        let inner = Arc::new(MonitorInner {
            ledger: Arc::clone(&ledger),
            watchers: Mutex::new(HashMap::new()),
        });
        let (refresh_tx, mut refresh_rx) = mpsc::channel(config.refresh_queue_depth);
        let tasks = TaskRegistry::new();

        // Serialized updater: the only task that writes snapshots.
        {
            let inner = Arc::clone(&inner);
            tasks.spawn_cancellable(async move {
                while let Some(id) = refresh_rx.recv().await {
                    inner.refresh(id).await;
                }
            });
        }

        // Event pump: every event kind is just a refresh hint for its id.
        let mut events = ledger.subscribe_events().await?;
        {
            let refresh_tx = refresh_tx.clone();
            tasks.spawn_cancellable(async move {
                while let Some(event) = events.recv().await {
                    let id = event.negotiation_id();
                    debug!(%id, ?event, "ledger event");
                    if refresh_tx.send(id).await.is_err() {
                        break;
                    }
                }
            });
        }

        // Periodic sweep: event delivery is best-effort, so every watched
        // negotiation gets re-read on a fixed cadence regardless.
        {
            let inner = Arc::clone(&inner);
            let refresh_tx = refresh_tx.clone();
            tasks.spawn_interval(config.sweep_interval, move || {
                let inner = Arc::clone(&inner);
                let refresh_tx = refresh_tx.clone();
                async move {
                    for id in inner.watched_ids() {
                        if refresh_tx.send(id).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }

        Ok(Self {
            inner,
            tasks,
            refresh_tx,
        })
    }

    /// Watch a negotiation, starting at a `Loading` placeholder until the
    /// first fetch lands. Watching an already-watched id subscribes to the
    /// existing channel.
    pub fn watch(&self, id: NegotiationId) -> watch::Receiver<NegotiationSnapshot> {
        let mut watchers = self.inner.watchers.lock();
        if let Some(sender) = watchers.get(&id) {
            return sender.subscribe();
        }
        let (sender, receiver) = watch::channel(NegotiationSnapshot::Loading { id });
        watchers.insert(id, sender);
        drop(watchers);

        // First fetch goes through the updater queue like any other.
        if self.refresh_tx.try_send(id).is_err() {
            warn!(%id, "refresh queue full, initial fetch deferred to sweep");
        }
        receiver
    }

    /// Watch every negotiation `party` participates in; returns their ids.
    pub async fn watch_user(&self, party: &PartyId) -> ParleyResult<Vec<NegotiationId>> {
        let ids = self.inner.ledger.user_negotiations(party).await?;
        for id in &ids {
            let _ = self.watch(*id);
        }
        Ok(ids)
    }

    /// Stop watching `id`, releasing its slot. When the last slot is
    /// released, process-wide ledger listeners are torn down so a provider
    /// reconnect cannot double-deliver.
    pub fn unwatch(&self, id: NegotiationId) {
        let mut watchers = self.inner.watchers.lock();
        watchers.remove(&id);
        if watchers.is_empty() {
            self.inner.ledger.clear_event_listeners();
        }
    }

    /// Re-fetch one negotiation immediately, bypassing the hint queue.
    /// Idempotent: with no ledger change, the replacement snapshot is
    /// structurally identical to the previous one.
    pub async fn refresh(&self, id: NegotiationId) {
        self.inner.refresh(id).await;
    }

    /// Number of currently-watched negotiations.
    pub fn watched_count(&self) -> usize {
        self.inner.watchers.lock().len()
    }

    /// Stop the pump, sweep, and updater tasks.
    pub fn shutdown(&self) {
        self.tasks.shutdown();
    }
}

impl MonitorInner {
    fn watched_ids(&self) -> Vec<NegotiationId> {
        self.watchers.lock().keys().copied().collect()
    }

    async fn refresh(&self, id: NegotiationId) {
        if !self.watchers.lock().contains_key(&id) {
            return;
        }
        match self.fetch(id).await {
            Ok(snapshot) => {
                if let Some(sender) = self.watchers.lock().get(&id) {
                    let _ = sender.send(snapshot);
                }
            }
            Err(error) => {
                // Keep the previous snapshot; the sweep will try again.
                warn!(%id, %error, "refresh failed");
            }
        }
    }

    async fn fetch(&self, id: NegotiationId) -> ParleyResult<NegotiationSnapshot> {
        let negotiation = self.ledger.read_negotiation(id).await?;
        let is_expired = self.ledger.is_expired(id).await?;
        let last_error = self.ledger.callback_debug_info(id).await?;
        Ok(NegotiationSnapshot::Ready {
            negotiation,
            is_expired,
            last_error,
        })
    }
}
