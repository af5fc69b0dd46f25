//! Encryption/decryption gateway effect interface.
//!
//! The gateway (relayer) performs threshold decryption of ledger-held
//! encrypted values. Its latency is human-timescale and transient
//! unavailability is expected, not exceptional; callers own the retry
//! policy. Bindings that can only surface free-text failures must map them
//! through [`crate::errors::classify_decrypt_failure`] so string inspection
//! stays out of business logic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ParleyError, ParleyResult};
use crate::identifiers::{ContractAddress, PartyId};
use crate::negotiation::{EncryptedRange, ValueHandle};

/// Network and contract binding for a gateway instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Chain the contract is deployed on; a connection to any other chain is
    /// a fatal bootstrap error.
    pub chain_id: u64,
    /// Negotiation contract address.
    pub contract: ContractAddress,
    /// Gateway/relayer endpoint.
    pub gateway_url: String,
}

/// One decrypted cleartext value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearValue {
    /// Decrypted boolean.
    Bool(bool),
    /// Decrypted unsigned integer.
    Uint(u64),
}

impl ClearValue {
    /// The boolean cleartext, or a malformed-result error.
    pub fn as_bool(&self) -> ParleyResult<bool> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Uint(value) => Err(ParleyError::malformed_result(format!(
                "expected boolean cleartext, got integer {value}"
            ))),
        }
    }

    /// The integer cleartext, or a malformed-result error.
    pub fn as_u64(&self) -> ParleyResult<u64> {
        match self {
            Self::Uint(value) => Ok(*value),
            Self::Bool(value) => Err(ParleyError::malformed_result(format!(
                "expected integer cleartext, got boolean {value}"
            ))),
        }
    }
}

/// Result of a public decryption: cleartexts keyed by the handle they
/// decrypt.
///
/// This keyed-by-handle shape is the documented gateway contract. A result
/// keyed any other way, or with a different entry count than requested, is a
/// malformed result the caller must reject.
#[derive(Debug, Clone, Default)]
pub struct DecryptedValues(HashMap<ValueHandle, ClearValue>);

impl DecryptedValues {
    /// Build from decrypted entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (ValueHandle, ClearValue)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Number of decrypted entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no entries were returned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cleartext for `handle`, if the gateway returned one.
    pub fn value(&self, handle: &ValueHandle) -> Option<&ClearValue> {
        self.0.get(handle)
    }
}

/// Encryption/decryption gateway operations.
#[async_trait]
pub trait GatewayEffects: Send + Sync {
    /// Encrypt a salary range for `contract`, bound to `user`.
    ///
    /// Fails with `InvalidInput` when `min > max` and with `NotInitialized`
    /// when called before the SDK bootstrap completed.
    async fn encrypt_range(
        &self,
        min: u64,
        max: u64,
        user: &PartyId,
        contract: &ContractAddress,
    ) -> ParleyResult<EncryptedRange>;

    /// Ask the gateway to publicly decrypt `handles`.
    ///
    /// Transient unavailability surfaces as `DecryptionTransient`; the caller
    /// decides whether and how often to retry.
    async fn public_decrypt(&self, handles: &[ValueHandle]) -> ParleyResult<DecryptedValues>;
}

/// Gateway SDK runtime: asset loading and instance construction.
///
/// The SDK ships as an external asset that becomes ready some time after
/// loading starts; callers poll [`SdkRuntime::poll_ready`] before the one-time
/// [`SdkRuntime::init_sdk`] and per-configuration
/// [`SdkRuntime::create_instance`].
#[async_trait]
pub trait SdkRuntime: Send + Sync {
    /// Begin loading the SDK asset. Idempotent.
    async fn load_bundle(&self) -> ParleyResult<()>;

    /// Whether the loaded SDK is ready for initialization.
    async fn poll_ready(&self) -> bool;

    /// One-time global SDK initialization.
    async fn init_sdk(&self) -> ParleyResult<()>;

    /// Construct a decryption-capable instance bound to `config`.
    async fn create_instance(
        &self,
        config: &GatewayConfig,
    ) -> ParleyResult<Arc<dyn GatewayEffects>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_value_accessors_enforce_type() {
        assert!(ClearValue::Bool(true).as_bool().expect("bool"));
        assert_eq!(ClearValue::Uint(7).as_u64().expect("uint"), 7);
        assert!(ClearValue::Uint(7).as_bool().is_err());
        assert!(ClearValue::Bool(false).as_u64().is_err());
    }

    #[test]
    fn decrypted_values_lookup_by_handle() {
        let a = ValueHandle::from_bytes([1u8; 32]);
        let b = ValueHandle::from_bytes([2u8; 32]);
        let values =
            DecryptedValues::from_entries([(a, ClearValue::Bool(true)), (b, ClearValue::Uint(9))]);
        assert_eq!(values.len(), 2);
        assert_eq!(values.value(&a), Some(&ClearValue::Bool(true)));
        assert_eq!(values.value(&ValueHandle::EMPTY), None);
    }
}
