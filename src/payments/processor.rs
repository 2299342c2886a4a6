//! Payment orchestration.
//!
//! # Data Flow
//! ```text
//! PaymentRequest
//!     → validate (address, amount syntax; no RPC)
//!     → ChainEndpointSelector (first live endpoint)
//!     → TokenContractClient::decimals → split
//!     → [sender lock] balance? → nonce → gas price → build pair → sign → broadcast
//!     → PaymentOutcome
//! ```
//!
//! The sender lock is held from the nonce read until both broadcasts have
//! returned, so two payments never sequence against the same nonce.
//!
//! `timeouts.request_secs` bounds the lock wait and every step before
//! signing. Broadcasting is not bounded by it: once a pair is signed the
//! caller always receives the per-leg outcome.

use alloy::primitives::Address;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

use crate::blockchain::broadcast::Broadcaster;
use crate::blockchain::endpoint::{ChainEndpointSelector, ChainSession};
use crate::blockchain::token::TokenContractClient;
use crate::blockchain::transaction::{GasPolicy, TransactionSequencer};
use crate::blockchain::types::{BlockchainError, ChainId};
use crate::blockchain::wallet::{SignedTx, SigningService, TransactionSigner};
use crate::config::RelayConfig;
use crate::observability::metrics;
use crate::payments::split::{split, SplitResult};
use crate::payments::types::{
    insufficient_balance, PaymentError, PaymentOutcome, PaymentRequest, ValidatedPayment,
};

/// Executes split payments for the single custodial sender.
pub struct PaymentProcessor {
    config: Arc<RelayConfig>,
    selector: ChainEndpointSelector,
    sequencer: TransactionSequencer,
    signing: SigningService,
    token: Address,
    fee_address: Address,
    sender_lock: Arc<Mutex<()>>,
}

impl PaymentProcessor {
    /// Build a processor from validated configuration and a signer.
    pub fn new(config: Arc<RelayConfig>, signer: Arc<dyn TransactionSigner>) -> Result<Self, PaymentError> {
        let token: Address = config
            .chain
            .token_address
            .parse()
            .map_err(|_| PaymentError::InvalidAddress("chain.token_address".to_string()))?;
        let fee_address: Address = config
            .fees
            .fee_address
            .parse()
            .map_err(|_| PaymentError::InvalidAddress("fees.fee_address".to_string()))?;

        let sequencer = TransactionSequencer::new(
            ChainId(config.chain.chain_id),
            token,
            GasPolicy::from_config(&config.chain),
        );

        Ok(Self {
            selector: ChainEndpointSelector::new(&config.chain),
            sequencer,
            signing: SigningService::new(signer),
            token,
            fee_address,
            sender_lock: Arc::new(Mutex::new(())),
            config,
        })
    }

    /// Address every payment is sent from.
    pub fn sender(&self) -> Address {
        self.signing.address()
    }

    pub fn network(&self) -> &str {
        &self.config.chain.network_name
    }

    /// Run one payment end to end.
    ///
    /// Returns `Err` only when nothing was broadcast because the request
    /// failed before signing completed. Once both legs are signed the
    /// result is always an outcome, whatever happened to each leg.
    pub async fn submit_payment(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        let started = Instant::now();
        let result = self.execute(request).await;

        match &result {
            Ok(outcome) => {
                metrics::record_payment(outcome.status.as_str(), started);
                tracing::info!(
                    status = outcome.status.as_str(),
                    recipient = %outcome.recipient_address,
                    recipient_amount = %outcome.recipient_amount,
                    fee_amount = %outcome.fee_amount,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Payment processed"
                );
            }
            Err(e) => {
                metrics::record_payment("error", started);
                tracing::warn!(error = %e, "Payment rejected");
            }
        }

        result
    }

    async fn execute(&self, request: &PaymentRequest) -> Result<PaymentOutcome, PaymentError> {
        let payment = request.validate()?;

        // Everything up to and including signing shares one budget. The
        // future only yields before signing, so a timeout never discards a
        // signed transaction.
        let budget = Duration::from_secs(self.config.timeouts.request_secs);
        let prepared = timeout(budget, self.prepare(&payment))
            .await
            .map_err(|_| PaymentError::Timeout { secs: budget.as_secs() })??;

        let PreparedPair {
            session,
            split,
            guard,
            recipient,
            fee,
        } = prepared;

        // Signed transactions are broadcast on a detached task so a dropped
        // caller cannot cancel them; the lock travels with the task.
        let broadcaster = Broadcaster::new(session);
        let pair = tokio::spawn(async move {
            let pair = broadcaster.broadcast_pair(&recipient, &fee).await;
            drop(guard);
            pair
        })
        .await
        .map_err(|e| BlockchainError::Broadcast(format!("broadcast task failed: {}", e)))?;

        Ok(PaymentOutcome::new(
            self.network(),
            payment.recipient,
            self.fee_address,
            &split,
            &pair,
        ))
    }

    async fn prepare(&self, payment: &ValidatedPayment) -> Result<PreparedPair, PaymentError> {
        let session = self.selector.select_endpoint().await?;
        let client = TokenContractClient::new(session.clone(), self.token);

        let meta = client.decimals().await?;
        let split = split(&payment.amount, meta.decimals, self.config.fees.fee_rate_bps)?;
        let sender = self.signing.address();

        tracing::debug!(
            endpoint = %session.label(),
            decimals = meta.decimals,
            total_units = %split.total_units,
            "Resolved payment split"
        );

        let guard = self.sender_lock.clone().lock_owned().await;

        if self.config.chain.preflight_balance_check {
            let balance = client.balance_of(sender).await?;
            if balance < split.total_units {
                return Err(insufficient_balance(balance, split.total_units, meta.decimals));
            }
        }

        let nonce = client.nonce(sender).await?;
        let gas_price = client.gas_price().await?;
        let (recipient_tx, fee_tx) = self.sequencer.build_pair(
            nonce,
            gas_price,
            payment.recipient,
            split.recipient_units,
            self.fee_address,
            split.fee_units,
        )?;

        let recipient = self.signing.sign(recipient_tx)?;
        let fee = self.signing.sign(fee_tx)?;

        Ok(PreparedPair {
            session,
            split,
            guard,
            recipient,
            fee,
        })
    }
}

/// A signed pair holding the sender lock, ready for broadcast.
struct PreparedPair {
    session: ChainSession,
    split: SplitResult,
    guard: OwnedMutexGuard<()>,
    recipient: SignedTx,
    fee: SignedTx,
}

impl std::fmt::Debug for PaymentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentProcessor")
            .field("network", &self.config.chain.network_name)
            .field("sender", &self.signing.address())
            .field("token", &self.token)
            .field("fee_address", &self.fee_address)
            .finish()
    }
}
