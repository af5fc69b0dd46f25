//! Unified error taxonomy for Parley operations.
//!
//! Every public operation either returns its result or fails with exactly one
//! of these kinds, each carrying a human-readable message. Only
//! [`ParleyError::DecryptionTransient`] is retryable; the reveal protocol
//! consumes it internally up to its budget and every other kind propagates to
//! the caller unchanged.

use serde::{Deserialize, Serialize};

/// Convenience alias used throughout the workspace.
pub type ParleyResult<T> = Result<T, ParleyError>;

/// Unified error type for all Parley operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ParleyError {
    /// Caller supplied an invalid range or acted outside its role/state.
    /// Rejected locally, before any ledger round-trip.
    #[error("Invalid: {message}")]
    InvalidInput {
        /// What was invalid.
        message: String,
    },

    /// Encryption/decryption primitive used before bootstrap completed.
    #[error("Not initialized: {message}")]
    NotInitialized {
        /// What was attempted too early.
        message: String,
    },

    /// Match handles are empty sentinels at reveal time; the match was never
    /// actually computed.
    #[error("Invalid handles: {message}")]
    InvalidHandles {
        /// Which handle was missing.
        message: String,
    },

    /// Ledger-side precondition for public decryption was never satisfied.
    /// Not retryable.
    #[error("Not marked for decryption: {message}")]
    NotMarkedForDecryption {
        /// Which handle is unmarked.
        message: String,
    },

    /// Gateway reports temporary unavailability. The only retryable kind.
    #[error("Decryption not ready: {message}")]
    DecryptionTransient {
        /// Gateway-reported reason.
        message: String,
    },

    /// Decryption retry budget exhausted.
    #[error("Decryption timed out after {attempts} attempts")]
    DecryptionTimeout {
        /// How many attempts were made before giving up.
        attempts: u32,
    },

    /// Gateway returned an unexpected result shape or value count.
    #[error("Malformed decryption result: {message}")]
    MalformedDecryptionResult {
        /// What was wrong with the shape.
        message: String,
    },

    /// Transaction reverted or failed to confirm.
    #[error("Ledger rejected: {message}")]
    LedgerRejected {
        /// Underlying reason when the ledger supplied one.
        message: String,
    },

    /// Transport-level failure talking to the ledger or gateway.
    #[error("Network error: {message}")]
    NetworkError {
        /// Transport failure description.
        message: String,
    },
}

impl ParleyError {
    /// Create an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not-initialized error.
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::NotInitialized {
            message: message.into(),
        }
    }

    /// Create an invalid-handles error.
    pub fn invalid_handles(message: impl Into<String>) -> Self {
        Self::InvalidHandles {
            message: message.into(),
        }
    }

    /// Create a not-marked-for-decryption error.
    pub fn not_marked(message: impl Into<String>) -> Self {
        Self::NotMarkedForDecryption {
            message: message.into(),
        }
    }

    /// Create a transient decryption error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::DecryptionTransient {
            message: message.into(),
        }
    }

    /// Create a malformed-result error.
    pub fn malformed_result(message: impl Into<String>) -> Self {
        Self::MalformedDecryptionResult {
            message: message.into(),
        }
    }

    /// Create a ledger-rejected error.
    pub fn ledger_rejected(message: impl Into<String>) -> Self {
        Self::LedgerRejected {
            message: message.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Whether the reveal retry loop may consume this error and try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DecryptionTransient { .. })
    }
}

/// Markers a gateway uses in free-text errors to signal "try again later".
///
/// Gateway bindings that only surface error text are adapted here, in one
/// place; no other module inspects error strings.
const TRANSIENT_MARKERS: &[&str] = &["not ready", "not available", "pending", "processing", "wait"];

/// Classify a free-text decryption failure from a gateway binding.
///
/// Text containing any transient marker becomes
/// [`ParleyError::DecryptionTransient`]; anything else is a hard
/// [`ParleyError::NetworkError`] and will not be retried.
pub fn classify_decrypt_failure(text: &str) -> ParleyError {
    let lowered = text.to_ascii_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        ParleyError::transient(text)
    } else {
        ParleyError::network(text)
    }
}
