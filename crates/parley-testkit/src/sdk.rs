//! SDK runtime stub.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use parley_core::effects::{GatewayConfig, GatewayEffects, SdkRuntime};
use parley_core::ParleyResult;

use crate::gateway::MockGateway;

/// [`SdkRuntime`] stub whose readiness and call counts are observable.
pub struct MockSdk {
    gateway: Arc<MockGateway>,
    ready_after_probes: AtomicU32,
    probes: AtomicU32,
    init_calls: AtomicU32,
    instances_created: AtomicU32,
}

impl MockSdk {
    /// Create an SDK that is ready on the first probe and hands out
    /// `gateway` as its instance.
    pub fn new(gateway: Arc<MockGateway>) -> Self {
        Self {
            gateway,
            ready_after_probes: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            init_calls: AtomicU32::new(0),
            instances_created: AtomicU32::new(0),
        }
    }

    /// Report "not ready" for the first `n` probes.
    pub fn ready_after_probes(&self, n: u32) {
        self.ready_after_probes.store(n, Ordering::SeqCst);
    }

    /// Number of readiness probes observed.
    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of `init_sdk` calls observed.
    pub fn init_calls(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Number of instances constructed.
    pub fn instances_created(&self) -> u32 {
        self.instances_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkRuntime for MockSdk {
    async fn load_bundle(&self) -> ParleyResult<()> {
        Ok(())
    }

    async fn poll_ready(&self) -> bool {
        let probe = self.probes.fetch_add(1, Ordering::SeqCst);
        probe >= self.ready_after_probes.load(Ordering::SeqCst)
    }

    async fn init_sdk(&self) -> ParleyResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_instance(
        &self,
        _config: &GatewayConfig,
    ) -> ParleyResult<Arc<dyn GatewayEffects>> {
        self.instances_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.gateway) as Arc<dyn GatewayEffects>)
    }
}
