//! Raw transaction broadcast.
//!
//! # Design Decisions
//! - Both legs are always attempted, recipient first, whatever happens to the other
//! - No retries: resubmitting with a stale nonce risks conflicting transactions
//! - Per-leg results are collected, never collapsed into a single error

use alloy::primitives::TxHash;
use serde::Serialize;
use tokio::time::timeout;

use crate::blockchain::endpoint::ChainSession;
use crate::blockchain::types::{BlockchainError, BlockchainResult, Leg};
use crate::blockchain::wallet::SignedTx;
use crate::observability::metrics;

/// Result of broadcasting one leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub leg: Leg,
    pub nonce: u64,
    pub result: Result<TxHash, String>,
}

impl TxOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        self.result.as_ref().ok().copied()
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }

    pub fn is_broadcast(&self) -> bool {
        self.result.is_ok()
    }
}

/// Which legs made it into the mempool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastState {
    Both,
    RecipientOnly,
    FeeOnly,
    Neither,
}

/// Outcomes for both legs, in nonce order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    pub recipient: TxOutcome,
    pub fee: TxOutcome,
}

impl PairOutcome {
    pub fn state(&self) -> BroadcastState {
        match (self.recipient.is_broadcast(), self.fee.is_broadcast()) {
            (true, true) => BroadcastState::Both,
            (true, false) => BroadcastState::RecipientOnly,
            (false, true) => BroadcastState::FeeOnly,
            (false, false) => BroadcastState::Neither,
        }
    }
}

/// Submits signed transactions to the endpoint selected for the request.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    session: ChainSession,
}

impl Broadcaster {
    pub fn new(session: ChainSession) -> Self {
        Self { session }
    }

    /// Submit one signed transaction via `eth_sendRawTransaction`.
    pub async fn broadcast(&self, signed: &SignedTx) -> BlockchainResult<TxHash> {
        let timeout_duration = self.session.timeout_duration();
        let fut = self.session.provider().send_raw_transaction(&signed.raw);

        let pending = match timeout(timeout_duration, fut).await {
            Ok(Ok(pending)) => pending,
            Ok(Err(e)) => return Err(BlockchainError::Broadcast(e.to_string())),
            Err(_) => {
                return Err(BlockchainError::Broadcast(format!(
                    "timed out after {}s",
                    timeout_duration.as_secs()
                )))
            }
        };

        let node_hash = *pending.tx_hash();
        if node_hash != signed.hash {
            tracing::warn!(
                leg = %signed.leg(),
                local_hash = %signed.hash,
                node_hash = %node_hash,
                "Node reported a different transaction hash"
            );
        }
        Ok(node_hash)
    }

    /// Broadcast the recipient leg, then the fee leg. A failure on one leg
    /// never prevents the attempt on the other.
    pub async fn broadcast_pair(&self, recipient: &SignedTx, fee: &SignedTx) -> PairOutcome {
        let recipient = self.attempt(recipient).await;
        let fee = self.attempt(fee).await;
        PairOutcome { recipient, fee }
    }

    async fn attempt(&self, signed: &SignedTx) -> TxOutcome {
        let result = self.broadcast(signed).await;
        metrics::record_broadcast(signed.leg().as_str(), result.is_ok());

        match &result {
            Ok(hash) => tracing::info!(
                leg = %signed.leg(),
                nonce = signed.unsigned.nonce,
                tx_hash = %hash,
                endpoint = %self.session.label(),
                "Transaction broadcast"
            ),
            Err(e) => tracing::error!(
                leg = %signed.leg(),
                nonce = signed.unsigned.nonce,
                error = %e,
                endpoint = %self.session.label(),
                "Transaction broadcast failed"
            ),
        }

        TxOutcome {
            leg: signed.leg(),
            nonce: signed.unsigned.nonce,
            result: result.map_err(|e| e.to_string()),
        }
    }
}
