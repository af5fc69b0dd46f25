//! Parley Engine - Negotiation Lifecycle Orchestrator
//!
//! Drives the encrypt → submit → compute → decrypt → reveal pipeline for
//! one negotiation contract, against whatever ledger and gateway bindings
//! it is constructed with.
//!
//! The ledger is the source of truth throughout: every local decision is
//! made against a freshly-read snapshot, every confirmed transaction is
//! followed by a re-read rather than a local state bump, and expiry is a
//! ledger-side predicate the orchestrator only consults.
//!
//! The hard part lives in [`reveal`]: decryption results from the external
//! gateway are not available immediately after the triggering transaction,
//! so the reveal protocol retries transient gateway failures on a fixed
//! interval up to a bounded budget before publishing the cleartext result.

#![forbid(unsafe_code)]

/// Retry and bootstrap tuning knobs
pub mod config;

/// Idempotent gateway SDK bootstrap
pub mod bootstrap;

/// Observable human-readable progress strings
pub mod progress;

/// The decrypt-and-reveal protocol
pub mod reveal;

/// The orchestrator facade
pub mod service;

pub use bootstrap::GatewayBootstrap;
pub use config::{BootstrapPolicy, RevealRetryPolicy};
pub use progress::ProgressReporter;
pub use service::NegotiationService;
