//! Custodial wallet and transaction signing.
//!
//! # Security
//! - The private key is loaded ONLY from an environment variable, once, at startup
//! - Keys are never logged, serialized or echoed in error messages
//! - Callers only ever see the [`TransactionSigner`] capability, never the key

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signature;
use std::sync::Arc;

use crate::blockchain::transaction::UnsignedTx;
use crate::blockchain::types::{BlockchainError, BlockchainResult, Leg};

/// Capability to sign transactions for a single sender address.
pub trait TransactionSigner: Send + Sync {
    /// Address the signatures recover to.
    fn address(&self) -> Address;

    /// Sign a legacy transaction's signature hash.
    fn sign_legacy(&self, tx: &mut TxLegacy) -> BlockchainResult<Signature>;
}

/// Wallet backed by a local secp256k1 key.
#[derive(Clone)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    ///
    /// # Security
    /// The private key is parsed and stored in memory. It is never logged,
    /// and parse failures do not echo any part of it.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        // Strip 0x prefix if present
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|_| BlockchainError::Signing("Invalid private key format".to_string()))?;

        tracing::info!(address = %signer.address(), "Wallet initialized");

        Ok(Self { signer })
    }

    /// Load wallet from the named environment variable.
    pub fn from_env(var_name: &str) -> BlockchainResult<Self> {
        let private_key = std::env::var(var_name).map_err(|_| {
            BlockchainError::Signing(format!("Environment variable {} not set", var_name))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl TransactionSigner for Wallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign_legacy(&self, tx: &mut TxLegacy) -> BlockchainResult<Signature> {
        TxSignerSync::sign_transaction_sync(&self.signer, tx)
            .map_err(|e| BlockchainError::Signing(format!("Sign tx failed: {}", e)))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

/// A signed, EIP-2718 encoded transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTx {
    pub unsigned: UnsignedTx,
    pub signature: Signature,
    pub raw: Bytes,
    pub hash: TxHash,
}

impl SignedTx {
    pub fn leg(&self) -> Leg {
        self.unsigned.leg
    }
}

/// Signs sequenced transactions with the custodial key.
#[derive(Clone)]
pub struct SigningService {
    signer: Arc<dyn TransactionSigner>,
}

impl SigningService {
    pub fn new(signer: Arc<dyn TransactionSigner>) -> Self {
        Self { signer }
    }

    /// Sender address for every transaction this service signs.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign one transaction. Fails only on malformed input or signer failure.
    pub fn sign(&self, unsigned: UnsignedTx) -> BlockchainResult<SignedTx> {
        if unsigned.gas_limit == 0 {
            return Err(BlockchainError::Signing("malformed transaction: zero gas limit".to_string()));
        }
        if unsigned.chain_id.0 == 0 {
            return Err(BlockchainError::Signing("malformed transaction: zero chain id".to_string()));
        }

        let mut tx = unsigned.to_legacy();
        let signature = self.signer.sign_legacy(&mut tx)?;
        let envelope: TxEnvelope = tx.into_signed(signature).into();
        let hash = *envelope.tx_hash();
        let raw: Bytes = envelope.encoded_2718().into();

        tracing::debug!(
            leg = %unsigned.leg,
            nonce = unsigned.nonce,
            tx_hash = %hash,
            "Signed transaction"
        );

        Ok(SignedTx {
            unsigned,
            signature,
            raw,
            hash,
        })
    }
}

impl std::fmt::Debug for SigningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningService")
            .field("address", &self.signer.address())
            .finish()
    }
}
