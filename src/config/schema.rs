//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.
//! Defaults describe the reference deployment (USDC on Polygon Amoy).

use serde::{Deserialize, Serialize};

/// Root configuration for the payment relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Chain connectivity and transaction policy.
    pub chain: ChainConfig,

    /// Fee split settings.
    pub fees: FeeConfig,

    /// Custodial wallet settings.
    pub wallet: WalletConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Chain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Human readable network name reported to callers.
    pub network_name: String,

    /// JSON-RPC endpoint URLs in priority order.
    pub endpoints: Vec<String>,

    /// Chain ID used for EIP-155 signing and endpoint verification.
    pub chain_id: u64,

    /// ERC-20 token contract the payments are made in.
    pub token_address: String,

    /// Per-call RPC timeout in seconds (probe, reads and broadcast).
    pub rpc_timeout_secs: u64,

    /// Gas limit applied to every transfer.
    pub gas_limit: u64,

    /// Gas price multiplier (1.0 = observed, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum observed gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Check the sender's token balance before signing anything.
    pub preflight_balance_check: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network_name: "Polygon Amoy".to_string(),
            endpoints: vec![
                "https://rpc-amoy.polygon.technology".to_string(),
                "https://polygon-amoy-bor-rpc.publicnode.com".to_string(),
                "https://rpc.ankr.com/polygon_amoy".to_string(),
            ],
            chain_id: 80002,
            token_address: "0x41E94Eb019C0762f9Bfcf9Fb1E58725BfB0e7582".to_string(),
            rpc_timeout_secs: 10,
            gas_limit: 100_000,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 5_000,
            preflight_balance_check: true,
        }
    }
}

/// Fee split configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Platform fee recipient.
    pub fee_address: String,

    /// Fee rate in basis points (200 = 2%).
    pub fee_rate_bps: u16,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_address: "0x2b01E2C0024aaF8362a11f91A545F24cB5e5261f".to_string(),
            fee_rate_bps: 200,
        }
    }
}

/// Custodial wallet configuration.
///
/// Only the name of the environment variable lives in the config file,
/// never the key itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Environment variable holding the hex-encoded private key.
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "RELAY_WALLET_PRIVATE_KEY".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Budget in seconds for everything before a payment is signed,
    /// including the wait for the sender lock. Broadcasting a signed pair
    /// is bounded by the per-call RPC timeout instead.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 120 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow cross-origin calls from any browser origin.
    pub cors_permissive: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024,
            cors_permissive: true,
        }
    }
}
