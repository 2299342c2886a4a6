//! Transaction sequencing and gas-price policy.
//!
//! # Responsibilities
//! - Build the recipient and fee transfers against one sender
//! - Assign consecutive nonces (recipient first, fee second)
//! - Apply the gas-price buffer and cap identically to both legs
//!
//! The nonce is read once per request and incremented locally; it is never
//! re-queried between the two legs.

use alloy::consensus::TxLegacy;
use alloy::primitives::{Address, Bytes, TxKind, U256};

use crate::blockchain::token::transfer_call;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig, ChainId, Leg};

const WEI_PER_GWEI: u128 = 1_000_000_000;
const BPS_DENOMINATOR: u128 = 10_000;

/// An unsigned ERC-20 transfer ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub leg: Leg,
    /// Token contract the call is sent to.
    pub to: Address,
    /// Encoded `transfer(beneficiary, units)`.
    pub data: Bytes,
    pub chain_id: ChainId,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
    /// Who receives the tokens.
    pub beneficiary: Address,
    pub units: U256,
}

impl UnsignedTx {
    /// Legacy (type 0) transaction with EIP-155 replay protection.
    pub fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id.0),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: U256::ZERO,
            input: self.data.clone(),
        }
    }
}

/// Gas price buffer, cap and fixed gas limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    /// Multiplier expressed in basis points (12_000 = 1.2x).
    pub multiplier_bps: u128,
    /// Cap on the observed base price in gwei; 0 disables the cap.
    pub max_gas_price_gwei: u64,
    pub gas_limit: u64,
}

impl GasPolicy {
    pub fn from_config(config: &ChainConfig) -> Self {
        Self {
            multiplier_bps: (config.gas_price_multiplier * BPS_DENOMINATOR as f64).round() as u128,
            max_gas_price_gwei: config.max_gas_price_gwei,
            gas_limit: config.gas_limit,
        }
    }

    /// Buffered gas price for an observed base price.
    pub fn apply(&self, base: u128) -> BlockchainResult<u128> {
        let too_high = || BlockchainError::GasPriceTooHigh {
            current_gwei: u64::try_from(base / WEI_PER_GWEI).unwrap_or(u64::MAX),
            max_gwei: self.max_gas_price_gwei,
        };

        if self.max_gas_price_gwei > 0 && base > self.max_gas_price_gwei as u128 * WEI_PER_GWEI {
            return Err(too_high());
        }

        base.checked_mul(self.multiplier_bps)
            .map(|scaled| scaled / BPS_DENOMINATOR)
            .ok_or_else(too_high)
    }
}

/// Builds the ordered pair of transfers for one payment.
#[derive(Debug, Clone)]
pub struct TransactionSequencer {
    chain_id: ChainId,
    token: Address,
    gas: GasPolicy,
}

impl TransactionSequencer {
    pub fn new(chain_id: ChainId, token: Address, gas: GasPolicy) -> Self {
        Self { chain_id, token, gas }
    }

    pub fn gas_policy(&self) -> &GasPolicy {
        &self.gas
    }

    /// Build `(recipient_tx, fee_tx)` with nonces `sender_nonce` and
    /// `sender_nonce + 1`. Zero-unit legs are built like any other.
    pub fn build_pair(
        &self,
        sender_nonce: u64,
        gas_price_base: u128,
        recipient: Address,
        recipient_units: U256,
        fee_address: Address,
        fee_units: U256,
    ) -> BlockchainResult<(UnsignedTx, UnsignedTx)> {
        let gas_price = self.gas.apply(gas_price_base)?;
        let fee_nonce = sender_nonce.checked_add(1).ok_or_else(|| {
            BlockchainError::query("eth_getTransactionCount", "sender nonce space exhausted")
        })?;

        let recipient_tx = self.transfer(Leg::Recipient, sender_nonce, gas_price, recipient, recipient_units);
        let fee_tx = self.transfer(Leg::Fee, fee_nonce, gas_price, fee_address, fee_units);

        tracing::debug!(
            recipient_nonce = recipient_tx.nonce,
            fee_nonce = fee_tx.nonce,
            gas_price_base = gas_price_base,
            gas_price = gas_price,
            "Built transfer pair"
        );

        Ok((recipient_tx, fee_tx))
    }

    fn transfer(&self, leg: Leg, nonce: u64, gas_price: u128, beneficiary: Address, units: U256) -> UnsignedTx {
        UnsignedTx {
            leg,
            to: self.token,
            data: transfer_call(beneficiary, units),
            chain_id: self.chain_id,
            gas_limit: self.gas.gas_limit,
            gas_price,
            nonce,
            beneficiary,
            units,
        }
    }
}
