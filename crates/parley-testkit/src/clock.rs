//! Controllable test clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_core::effects::TimeEffects;

/// Clock whose `sleep_ms` returns immediately, advancing simulated time and
/// recording the requested delay.
#[derive(Debug)]
pub struct MockClock {
    now_ms: AtomicU64,
    sleeps: Mutex<Vec<u64>>,
}

impl MockClock {
    /// Create a clock starting at `start_secs` epoch seconds.
    pub fn new(start_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicU64::new(start_secs * 1000),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    /// Advance simulated time without recording a sleep.
    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    /// Every delay requested through `sleep_ms`, in call order.
    pub fn recorded_sleeps(&self) -> Vec<u64> {
        self.sleeps.lock().clone()
    }

    /// Sum of all recorded delays, milliseconds.
    pub fn total_slept_ms(&self) -> u64 {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl TimeEffects for MockClock {
    async fn now_secs(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst) / 1000
    }

    async fn sleep_ms(&self, ms: u64) {
        self.sleeps.lock().push(ms);
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
        // Let other cooperative tasks run, as a real timer would.
        tokio::task::yield_now().await;
    }
}
