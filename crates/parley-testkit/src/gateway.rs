//! Scriptable mock gateway.
//!
//! Decrypts handles out of a [`HandleVault`] shared with the mock ledger.
//! Failure sequences are scripted per call, so tests can exercise the
//! reveal protocol's retry and classification behavior deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use parley_core::effects::{ClearValue, DecryptedValues, GatewayEffects};
use parley_core::{
    ContractAddress, EncryptedRange, EncryptedValue, ParleyError, ParleyResult, PartyId,
    RangeProof, ValueHandle,
};

/// Cleartexts behind encrypted-value handles, shared between the mock
/// ledger (writer) and the mock gateway (reader).
#[derive(Debug, Default)]
pub struct HandleVault {
    values: Mutex<HashMap<ValueHandle, ClearValue>>,
}

impl HandleVault {
    /// Create an empty vault.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store the cleartext behind `handle`.
    pub fn store(&self, handle: ValueHandle, value: ClearValue) {
        self.values.lock().insert(handle, value);
    }

    /// Cleartext behind `handle`, if one was stored.
    pub fn lookup(&self, handle: &ValueHandle) -> Option<ClearValue> {
        self.values.lock().get(handle).copied()
    }
}

/// Shape of the decryption result the mock returns, for malformed-result
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultShape {
    /// Faithful keyed-by-handle map.
    #[default]
    Faithful,
    /// Drop one requested entry.
    DropOne,
    /// Add an entry for a handle nobody asked about.
    ExtraEntry,
    /// Swap boolean and integer cleartext types.
    WrongTypes,
}

/// Mock implementation of [`GatewayEffects`] with scripted failures.
pub struct MockGateway {
    vault: Arc<HandleVault>,
    ready: AtomicBool,
    always_transient: AtomicBool,
    paused: AtomicBool,
    resume: tokio::sync::Notify,
    decrypt_attempts: AtomicU32,
    scripted: Mutex<VecDeque<ParleyError>>,
    shape: Mutex<ResultShape>,
}

impl MockGateway {
    /// Create a ready gateway reading cleartexts from `vault`.
    pub fn new(vault: Arc<HandleVault>) -> Self {
        Self {
            vault,
            ready: AtomicBool::new(true),
            always_transient: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            resume: tokio::sync::Notify::new(),
            decrypt_attempts: AtomicU32::new(0),
            scripted: Mutex::new(VecDeque::new()),
            shape: Mutex::new(ResultShape::Faithful),
        }
    }

    /// Mark the gateway (un)initialized; an unready gateway fails every
    /// operation with `NotInitialized`.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Script the next decryption calls to fail transiently `n` times
    /// before behaving normally again.
    pub fn fail_transient_times(&self, n: u32) {
        let mut scripted = self.scripted.lock();
        for _ in 0..n {
            scripted.push_back(ParleyError::transient("decryption result pending"));
        }
    }

    /// Script the next decryption call to fail with `error`.
    pub fn fail_next_with(&self, error: ParleyError) {
        self.scripted.lock().push_back(error);
    }

    /// Make every decryption call report transient unavailability.
    pub fn always_transient(&self) {
        self.always_transient.store(true, Ordering::SeqCst);
    }

    /// Override the result shape returned on successful decryption.
    pub fn set_result_shape(&self, shape: ResultShape) {
        *self.shape.lock() = shape;
    }

    /// Park decryption calls until [`MockGateway::resume_decryption`], so a
    /// test can observe an operation mid-flight.
    pub fn pause_decryption(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Release decryption calls parked by
    /// [`MockGateway::pause_decryption`].
    pub fn resume_decryption(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    /// How many decryption calls have been made.
    pub fn decrypt_attempts(&self) -> u32 {
        self.decrypt_attempts.load(Ordering::SeqCst)
    }

    fn check_ready(&self) -> ParleyResult<()> {
        if self.ready.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ParleyError::not_initialized(
                "gateway instance not created yet",
            ))
        }
    }
}

#[async_trait]
impl GatewayEffects for MockGateway {
    async fn encrypt_range(
        &self,
        min: u64,
        max: u64,
        user: &PartyId,
        contract: &ContractAddress,
    ) -> ParleyResult<EncryptedRange> {
        self.check_ready()?;
        if min > max {
            return Err(ParleyError::invalid(format!(
                "range lower bound {min} exceeds upper bound {max}"
            )));
        }
        // Mock "ciphertext": the little-endian bound, verifiable by the mock
        // ledger. The proof binds user and contract only nominally.
        let proof = format!("proof:{}:{}", user.as_str(), contract.as_str());
        Ok(EncryptedRange {
            enc_min: EncryptedValue(min.to_le_bytes().to_vec()),
            enc_max: EncryptedValue(max.to_le_bytes().to_vec()),
            proof: RangeProof(proof.into_bytes()),
        })
    }

    async fn public_decrypt(&self, handles: &[ValueHandle]) -> ParleyResult<DecryptedValues> {
        self.check_ready()?;
        self.decrypt_attempts.fetch_add(1, Ordering::SeqCst);

        loop {
            if !self.paused.load(Ordering::SeqCst) {
                break;
            }
            let resumed = self.resume.notified();
            if !self.paused.load(Ordering::SeqCst) {
                break;
            }
            resumed.await;
        }

        if self.always_transient.load(Ordering::SeqCst) {
            return Err(ParleyError::transient("decryption result pending"));
        }
        if let Some(error) = self.scripted.lock().pop_front() {
            return Err(error);
        }

        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            let value = self.vault.lookup(handle).ok_or_else(|| {
                ParleyError::network(format!("gateway knows no value for handle {handle}"))
            })?;
            entries.push((*handle, value));
        }

        match *self.shape.lock() {
            ResultShape::Faithful => {}
            ResultShape::DropOne => {
                entries.pop();
            }
            ResultShape::ExtraEntry => {
                entries.push((ValueHandle::from_bytes([0xee; 32]), ClearValue::Uint(0)));
            }
            ResultShape::WrongTypes => {
                for (_, value) in entries.iter_mut() {
                    *value = match value {
                        ClearValue::Bool(b) => ClearValue::Uint(u64::from(*b)),
                        ClearValue::Uint(u) => ClearValue::Bool(*u != 0),
                    };
                }
            }
        }

        Ok(DecryptedValues::from_entries(entries))
    }
}
