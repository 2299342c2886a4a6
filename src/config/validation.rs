//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use alloy::primitives::Address;

use crate::config::schema::{ChainConfig, RelayConfig};

/// Largest fee rate expressible in basis points (100%).
pub const MAX_FEE_RATE_BPS: u16 = 10_000;

/// Chain reads made before signing: decimals, balance, nonce, gas price.
pub const PREPARATION_READS: u64 = 4;

/// Worst-case time before a payment is signed when every RPC call runs to
/// its timeout.
pub fn preparation_budget_secs(chain: &ChainConfig) -> u64 {
    (chain.endpoints.len() as u64 + PREPARATION_READS).saturating_mul(chain.rpc_timeout_secs)
}

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `chain.endpoints[1]`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let chain = &config.chain;
    if chain.endpoints.is_empty() {
        errors.push(ValidationError::new("chain.endpoints", "at least one endpoint is required"));
    }
    for (i, endpoint) in chain.endpoints.iter().enumerate() {
        if let Err(e) = endpoint.parse::<url::Url>() {
            errors.push(ValidationError::new(
                format!("chain.endpoints[{}]", i),
                format!("invalid URL '{}': {}", endpoint, e),
            ));
        }
    }
    if chain.chain_id == 0 {
        errors.push(ValidationError::new("chain.chain_id", "must be non-zero"));
    }
    if chain.token_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new("chain.token_address", "not a valid address"));
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be greater than 0"));
    }
    if chain.gas_limit == 0 {
        errors.push(ValidationError::new("chain.gas_limit", "must be greater than 0"));
    }
    if !chain.gas_price_multiplier.is_finite() || chain.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "chain.gas_price_multiplier",
            "must be a finite value of at least 1.0",
        ));
    }

    match config.fees.fee_address.parse::<Address>() {
        Ok(address) if address.is_zero() => {
            errors.push(ValidationError::new("fees.fee_address", "zero address not allowed"));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::new("fees.fee_address", "not a valid address")),
    }
    if config.fees.fee_rate_bps > MAX_FEE_RATE_BPS {
        errors.push(ValidationError::new(
            "fees.fee_rate_bps",
            format!("must not exceed {}", MAX_FEE_RATE_BPS),
        ));
    }

    if config.wallet.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must name an environment variable"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else if config.timeouts.request_secs < preparation_budget_secs(chain) {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must be at least {}s ({} endpoint probes and {} reads at {}s each)",
                preparation_budget_secs(chain),
                chain.endpoints.len(),
                PREPARATION_READS,
                chain.rpc_timeout_secs
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
