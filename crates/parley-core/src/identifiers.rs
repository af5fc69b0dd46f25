//! Identifiers for negotiations, parties, and ledger transactions.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Ledger-assigned identifier of a negotiation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NegotiationId(pub u64);

impl NegotiationId {
    /// Raw numeric value as assigned by the ledger.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NegotiationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for NegotiationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Confirmation reference of a submitted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(String);

impl TxRef {
    /// Wrap a raw transaction reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Reference string as produced by the ledger.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of the negotiation contract on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractAddress(String);

impl ContractAddress {
    /// Wrap a contract address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of a negotiation party.
///
/// Ledger identities compare case-insensitively (mixed-case checksummed and
/// lowercased renderings of the same address are the same party), so equality
/// and hashing both normalize to ASCII lowercase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyId(String);

impl PartyId {
    /// Wrap a raw identity string.
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// Identity string exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PartyId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PartyId {}

impl Hash for PartyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartyId {
    fn from(identity: &str) -> Self {
        Self::new(identity)
    }
}

impl From<String> for PartyId {
    fn from(identity: String) -> Self {
        Self(identity)
    }
}
