//! Parley Sync - Live Negotiation Snapshots
//!
//! Maintains a continuously-updated snapshot per watched negotiation,
//! visible to any number of subscribers through watch channels.
//!
//! Two independent triggers feed one serialized updater: ledger event
//! notifications (fast path, best-effort delivery) and a periodic sweep
//! over every watched negotiation (the backstop for missed events,
//! reconnects, and provider gaps). Updates always replace the whole
//! snapshot; fields that must be read together (state and handles) can
//! never drift apart.

#![forbid(unsafe_code)]

/// Background task registry with cooperative shutdown
pub mod tasks;

/// Published snapshot shape
pub mod snapshot;

/// The negotiation monitor
pub mod monitor;

pub use monitor::{MonitorConfig, NegotiationMonitor};
pub use snapshot::NegotiationSnapshot;
pub use tasks::TaskRegistry;
