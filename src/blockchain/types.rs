//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Which side of the split a transaction pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// Transfer to the requested recipient (first nonce).
    Recipient,
    /// Transfer to the platform fee address (second nonce).
    Fee,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Recipient => "recipient",
            Leg::Fee => "fee",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Every configured endpoint failed its liveness probe.
    #[error("No chain endpoint available ({tried} tried)")]
    NoEndpointAvailable { tried: usize },

    /// A read against the selected endpoint failed or timed out.
    #[error("Chain query '{query}' failed: {cause}")]
    ChainQuery { query: &'static str, cause: String },

    /// Invalid private key format or signing failure.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Submitting a signed transaction failed.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl BlockchainError {
    pub(crate) fn query(query: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::ChainQuery {
            query,
            cause: cause.to_string(),
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
