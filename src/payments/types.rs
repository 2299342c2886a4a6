//! Payment request, outcome and error types.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::broadcast::{BroadcastState, PairOutcome};
use crate::blockchain::types::BlockchainError;
use crate::payments::split::{format_units, DecimalAmount, SplitResult};

/// Errors that end a payment before any transaction is broadcast.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Recipient is not a usable address.
    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    /// Amount is malformed, non-positive or below one token unit.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The custodial wallet cannot cover the payment.
    #[error("Insufficient token balance: available {available}, required {required}")]
    InsufficientBalance { available: String, required: String },

    /// Nothing was signed within the request budget.
    #[error("Payment not prepared within {secs}s; nothing was signed")]
    Timeout { secs: u64 },

    #[error(transparent)]
    Chain(#[from] BlockchainError),
}

/// Amount as sent by the caller: a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    pub fn as_text(&self) -> String {
        match self {
            AmountInput::Number(n) => n.to_string(),
            AmountInput::Text(s) => s.clone(),
        }
    }
}

/// Inbound payment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub recipient_address: String,
    pub amount: AmountInput,
}

/// A request whose fields passed syntax checks. No chain access happened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub recipient: Address,
    pub amount: DecimalAmount,
}

impl PaymentRequest {
    pub fn validate(&self) -> Result<ValidatedPayment, PaymentError> {
        Ok(ValidatedPayment {
            recipient: parse_recipient(&self.recipient_address)?,
            amount: DecimalAmount::parse(&self.amount.as_text())?,
        })
    }
}

/// Parse a `0x`-prefixed 20-byte hex address.
///
/// Mixed-case input must carry a valid EIP-55 checksum. The zero address
/// is refused since tokens sent there are burned.
pub fn parse_recipient(text: &str) -> Result<Address, PaymentError> {
    let text = text.trim();
    let hex = text
        .strip_prefix("0x")
        .ok_or_else(|| PaymentError::InvalidAddress("missing 0x prefix".to_string()))?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PaymentError::InvalidAddress("expected 40 hex characters".to_string()));
    }

    let mixed_case = hex.bytes().any(|b| b.is_ascii_lowercase()) && hex.bytes().any(|b| b.is_ascii_uppercase());
    let address = if mixed_case {
        Address::parse_checksummed(text, None)
            .map_err(|_| PaymentError::InvalidAddress("checksum mismatch".to_string()))?
    } else {
        text.parse::<Address>()
            .map_err(|e| PaymentError::InvalidAddress(e.to_string()))?
    };

    if address.is_zero() {
        return Err(PaymentError::InvalidAddress("zero address not allowed".to_string()));
    }
    Ok(address)
}

/// Overall status of a payment whose legs were broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Success,
    Partial,
    Failed,
}

impl From<BroadcastState> for PaymentStatus {
    fn from(state: BroadcastState) -> Self {
        match state {
            BroadcastState::Both => PaymentStatus::Success,
            BroadcastState::RecipientOnly | BroadcastState::FeeOnly => PaymentStatus::Partial,
            BroadcastState::Neither => PaymentStatus::Failed,
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Success => "success",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Aggregated result of one payment, reported per leg.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub network: String,
    pub broadcast: BroadcastState,
    pub recipient_address: Address,
    pub fee_address: Address,
    pub recipient_tx_hash: Option<TxHash>,
    pub fee_tx_hash: Option<TxHash>,
    pub recipient_error: Option<String>,
    pub fee_error: Option<String>,
    pub recipient_amount: String,
    pub fee_amount: String,
    /// Integer token units, as decimal strings.
    pub recipient_units: String,
    pub fee_units: String,
    pub recipient_nonce: u64,
    pub fee_nonce: u64,
}

impl PaymentOutcome {
    pub fn new(
        network: &str,
        recipient_address: Address,
        fee_address: Address,
        split: &SplitResult,
        pair: &PairOutcome,
    ) -> Self {
        let broadcast = pair.state();
        Self {
            status: broadcast.into(),
            network: network.to_string(),
            broadcast,
            recipient_address,
            fee_address,
            recipient_tx_hash: pair.recipient.tx_hash(),
            fee_tx_hash: pair.fee.tx_hash(),
            recipient_error: pair.recipient.error().map(str::to_string),
            fee_error: pair.fee.error().map(str::to_string),
            recipient_amount: split.recipient_amount(),
            fee_amount: split.fee_amount(),
            recipient_units: split.recipient_units.to_string(),
            fee_units: split.fee_units.to_string(),
            recipient_nonce: pair.recipient.nonce,
            fee_nonce: pair.fee.nonce,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}

/// Error body returned before anything was broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

pub(crate) fn insufficient_balance(available: U256, required: U256, decimals: u8) -> PaymentError {
    PaymentError::InsufficientBalance {
        available: format_units(available, decimals),
        required: format_units(required, decimals),
    }
}
