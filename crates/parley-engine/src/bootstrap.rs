//! Idempotent gateway SDK bootstrap.
//!
//! The decryption-capable gateway instance is constructed exactly once per
//! process: the SDK asset is loaded, polled for readiness with exponential
//! back-off, globally initialized, and then bound to the configured network
//! and contract. Concurrent callers all resolve from the same in-flight
//! attempt; a failed attempt leaves nothing cached, so a later call starts
//! fresh.
//!
//! Network-identity mismatch and missing contract code are fatal and never
//! retried internally - they indicate misconfiguration, not transient load.

use std::sync::Arc;

use parley_core::effects::{GatewayConfig, GatewayEffects, LedgerEffects, SdkRuntime, TimeEffects};
use parley_core::{ParleyError, ParleyResult};
use tracing::{debug, info};

use crate::config::BootstrapPolicy;

/// One-time constructor of the process-wide gateway instance.
pub struct GatewayBootstrap {
    sdk: Arc<dyn SdkRuntime>,
    ledger: Arc<dyn LedgerEffects>,
    clock: Arc<dyn TimeEffects>,
    config: GatewayConfig,
    policy: BootstrapPolicy,
    // Async mutex: held across the whole initialization so concurrent
    // callers queue behind one attempt instead of racing their own.
    instance: async_lock::Mutex<Option<Arc<dyn GatewayEffects>>>,
}

impl GatewayBootstrap {
    /// Create a bootstrap bound to `config`. Nothing happens until the
    /// first [`GatewayBootstrap::instance`] call.
    pub fn new(
        sdk: Arc<dyn SdkRuntime>,
        ledger: Arc<dyn LedgerEffects>,
        clock: Arc<dyn TimeEffects>,
        config: GatewayConfig,
        policy: BootstrapPolicy,
    ) -> Self {
        Self {
            sdk,
            ledger,
            clock,
            config,
            policy,
            instance: async_lock::Mutex::new(None),
        }
    }

    /// Contract binding this bootstrap was configured with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The gateway instance, constructing it on first use.
    pub async fn instance(&self) -> ParleyResult<Arc<dyn GatewayEffects>> {
        let mut slot = self.instance.lock().await;
        if let Some(instance) = slot.as_ref() {
            return Ok(Arc::clone(instance));
        }
        let instance = self.initialize().await?;
        *slot = Some(Arc::clone(&instance));
        Ok(instance)
    }

    async fn initialize(&self) -> ParleyResult<Arc<dyn GatewayEffects>> {
        self.sdk.load_bundle().await?;
        self.wait_for_sdk().await?;
        self.sdk.init_sdk().await?;

        let chain = self.ledger.chain_id().await?;
        if chain != self.config.chain_id {
            return Err(ParleyError::network(format!(
                "wrong network: connected to chain {chain}, contract lives on chain {}",
                self.config.chain_id
            )));
        }
        if !self.ledger.has_contract_code().await? {
            return Err(ParleyError::invalid(format!(
                "no contract code at {}",
                self.config.contract
            )));
        }

        let instance = self.sdk.create_instance(&self.config).await?;
        info!(chain, contract = %self.config.contract, "gateway instance ready");
        Ok(instance)
    }

    async fn wait_for_sdk(&self) -> ParleyResult<()> {
        let max = self.policy.max_probe_attempts;
        let mut delay = self.policy.probe_base_delay_ms;
        for attempt in 1..=max {
            if self.sdk.poll_ready().await {
                debug!(attempt, "gateway SDK ready");
                return Ok(());
            }
            if attempt == max {
                break;
            }
            self.clock.sleep_ms(delay).await;
            delay = (delay * 2).min(self.policy.probe_delay_cap_ms);
        }
        Err(ParleyError::not_initialized(format!(
            "gateway SDK failed to load after {max} probes"
        )))
    }
}
