//! Test Effects Utilities
//!
//! Deterministic in-memory implementations of Parley's effect interfaces,
//! shared by tests across the workspace. The mock ledger enforces the same
//! state-machine preconditions as the real contract, the mock gateway
//! supports scripted failure sequences, and the mock clock advances
//! instantly while recording every requested delay, so retry-timing tests
//! finish in microseconds.
//!
//! Nothing here is production code; production bindings for the ledger and
//! gateway live outside this workspace.

#![forbid(unsafe_code)]

/// Controllable clock recording requested delays
pub mod clock;

/// In-memory ledger with contract-equivalent preconditions and events
pub mod ledger;

/// Scriptable encryption/decryption gateway
pub mod gateway;

/// SDK runtime stub with configurable readiness
pub mod sdk;

use std::sync::Arc;

pub use clock::MockClock;
pub use gateway::{HandleVault, MockGateway, ResultShape};
pub use ledger::{MockLedger, MOCK_CHAIN_ID};
pub use sdk::MockSdk;

/// Everything a lifecycle test needs, wired together: one clock shared by
/// ledger and tests, one handle vault shared by ledger and gateway.
pub struct TestHarness {
    /// Shared controllable clock.
    pub clock: Arc<MockClock>,
    /// Mock ledger.
    pub ledger: Arc<MockLedger>,
    /// Mock gateway, already bound to the ledger's handle vault.
    pub gateway: Arc<MockGateway>,
    /// SDK runtime producing `gateway` as its instance.
    pub sdk: Arc<MockSdk>,
}

impl TestHarness {
    /// Build a harness with the default chain id and an immediately-ready
    /// SDK.
    pub fn new() -> Self {
        let clock = MockClock::new(1_700_000_000);
        let vault = HandleVault::new();
        let ledger = Arc::new(MockLedger::new(Arc::clone(&clock), Arc::clone(&vault)));
        let gateway = Arc::new(MockGateway::new(vault));
        let sdk = Arc::new(MockSdk::new(Arc::clone(&gateway)));
        Self {
            clock,
            ledger,
            gateway,
            sdk,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
