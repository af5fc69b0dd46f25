//! Observable progress reporting.
//!
//! Long-running operations publish a human-readable status string through a
//! watch channel ("Decrypting... (attempt 3/20)"). Presentation layers
//! subscribe and render it; it is a side channel, never part of an
//! operation's return value or error.

use tokio::sync::watch;

/// Writer side of one operation's progress channel.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: watch::Sender<String>,
}

impl ProgressReporter {
    /// Create a reporter and the receiver observers subscribe to.
    pub fn new(initial: impl Into<String>) -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(initial.into());
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    pub(crate) fn from_sender(tx: watch::Sender<String>) -> Self {
        Self { tx }
    }

    /// Publish a new status string, replacing the previous one.
    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(progress = %message, "progress");
        // Nobody watching is fine; progress is best-effort.
        let _ = self.tx.send(message);
    }
}
