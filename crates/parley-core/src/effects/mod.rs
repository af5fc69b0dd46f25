//! Pure effect interfaces for Parley's external collaborators.
//!
//! The orchestrator never talks to a ledger node or a decryption gateway
//! directly; it is parameterized by these traits and handed `Arc<dyn …>`
//! handles at construction. Production bindings live outside this workspace;
//! deterministic mocks live in `parley-testkit`.

/// Ledger/contract access operations
pub mod ledger;

/// Encryption/decryption gateway operations and SDK loading
pub mod gateway;

/// Time access and cooperative delays
pub mod time;

pub use gateway::{ClearValue, DecryptedValues, GatewayConfig, GatewayEffects, SdkRuntime};
pub use ledger::LedgerEffects;
pub use time::TimeEffects;
