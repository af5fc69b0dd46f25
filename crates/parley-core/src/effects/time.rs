//! Time effect interface.
//!
//! Deadlines and retry delays go through this trait so the retry protocol is
//! testable without real waiting. The production handler delegates to system
//! time and the tokio timer; the testkit clock advances instantly and records
//! every requested delay.

use async_trait::async_trait;

/// Time access and cooperative delays.
#[async_trait]
pub trait TimeEffects: Send + Sync {
    /// Current time, epoch seconds.
    async fn now_secs(&self) -> u64;

    /// Suspend the caller for `ms` milliseconds.
    async fn sleep_ms(&self, ms: u64);
}
