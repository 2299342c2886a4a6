//! Response mapping.
//!
//! # Responsibilities
//! - Map payment errors to HTTP status codes and `{status: "error", message}` bodies
//! - Map broadcast outcomes to 200 (both legs) or 502 (any leg missing)
//!
//! # Design Decisions
//! - Validation failures are 400 and never touch the chain
//! - Unreachable chain is 503 so callers can tell it from a bad request
//! - A request that ran out of time before signing is 504; nothing was sent
//! - Partial broadcasts carry the full per-leg body, never a bare error

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::blockchain::types::BlockchainError;
use crate::payments::types::{ErrorBody, PaymentError, PaymentOutcome};

/// HTTP status for an error raised before broadcast.
pub fn status_for(error: &PaymentError) -> StatusCode {
    match error {
        PaymentError::InvalidAddress(_) | PaymentError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        PaymentError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        PaymentError::Chain(chain) => match chain {
            BlockchainError::NoEndpointAvailable { .. } | BlockchainError::GasPriceTooHigh { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BlockchainError::ChainQuery { .. }
            | BlockchainError::ChainMismatch { .. }
            | BlockchainError::Broadcast(_) => StatusCode::BAD_GATEWAY,
            BlockchainError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            // Signer errors are reported generically
            PaymentError::Chain(BlockchainError::Signing(_)) => "Transaction signing failed".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody::new(message))).into_response()
    }
}

/// HTTP status for a payment that reached broadcast.
pub fn outcome_status(outcome: &PaymentOutcome) -> StatusCode {
    if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    }
}

impl IntoResponse for PaymentOutcome {
    fn into_response(self) -> Response {
        (outcome_status(&self), Json(self)).into_response()
    }
}
