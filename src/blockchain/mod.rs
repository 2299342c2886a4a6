//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Configured endpoints
//!     → endpoint.rs (ordered liveness probe, per-call timeouts)
//!     → token.rs (decimals, nonce, gas price, balance, transfer encoding)
//!     → transaction.rs (nonce sequencing, gas policy)
//!     → wallet.rs (signing with the custodial key)
//!     → broadcast.rs (eth_sendRawTransaction per leg)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Endpoint paths (often carrying API keys) are kept out of logs

pub mod broadcast;
pub mod endpoint;
pub mod token;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use broadcast::{BroadcastState, Broadcaster, PairOutcome, TxOutcome};
pub use endpoint::{ChainEndpointSelector, ChainSession};
pub use token::{TokenContractClient, TokenMeta};
pub use transaction::{GasPolicy, TransactionSequencer, UnsignedTx};
pub use types::{BlockchainError, BlockchainResult, ChainId, Leg};
pub use wallet::{SignedTx, SigningService, TransactionSigner, Wallet};
