//! ERC-20 token reads and transfer call encoding.
//!
//! Every read goes through the session timeout and fails loudly; no value
//! is ever synthesized locally when the node does not answer.

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use std::future::IntoFuture;

use crate::blockchain::endpoint::ChainSession;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    /// The subset of ERC-20 the relay needs.
    interface IERC20 {
        function transfer(address to, uint256 value) external returns (bool);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// Largest decimals value whose power of ten fits in a U256.
pub const MAX_TOKEN_DECIMALS: u8 = 77;

/// Token metadata resolved for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMeta {
    pub decimals: u8,
}

/// Client for one token contract, bound to the endpoint selected for the request.
#[derive(Debug, Clone)]
pub struct TokenContractClient {
    session: ChainSession,
    token: Address,
}

impl TokenContractClient {
    pub fn new(session: ChainSession, token: Address) -> Self {
        Self { session, token }
    }

    pub fn session(&self) -> &ChainSession {
        &self.session
    }

    pub fn token(&self) -> Address {
        self.token
    }

    /// Read `decimals()` from the contract.
    pub async fn decimals(&self) -> BlockchainResult<TokenMeta> {
        let raw = self.call("decimals", IERC20::decimalsCall {}.abi_encode()).await?;
        let decimals = IERC20::decimalsCall::abi_decode_returns(&raw)
            .map_err(|e| BlockchainError::query("decimals", e))?;

        if decimals > MAX_TOKEN_DECIMALS {
            return Err(BlockchainError::query(
                "decimals",
                format!("unsupported token decimals {}", decimals),
            ));
        }
        Ok(TokenMeta { decimals })
    }

    /// Read the token balance of `account`.
    pub async fn balance_of(&self, account: Address) -> BlockchainResult<U256> {
        let raw = self
            .call("balanceOf", IERC20::balanceOfCall { account }.abi_encode())
            .await?;
        IERC20::balanceOfCall::abi_decode_returns(&raw)
            .map_err(|e| BlockchainError::query("balanceOf", e))
    }

    /// Next usable nonce for `address`, counting the node's pending pool.
    pub async fn nonce(&self, address: Address) -> BlockchainResult<u64> {
        let count = self
            .session
            .provider()
            .get_transaction_count(address)
            .pending()
            .into_future();
        self.session.timed("eth_getTransactionCount", count).await
    }

    /// Point-in-time gas price in wei.
    pub async fn gas_price(&self) -> BlockchainResult<u128> {
        self.session
            .timed("eth_gasPrice", self.session.provider().get_gas_price())
            .await
    }

    async fn call(&self, query: &'static str, data: Vec<u8>) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default()
            .to(self.token)
            .input(Bytes::from(data).into());
        self.session
            .timed(query, self.session.provider().call(request).into_future())
            .await
    }
}

/// ABI-encode `transfer(to, units)`.
pub fn transfer_call(to: Address, units: U256) -> Bytes {
    IERC20::transferCall { to, value: units }.abi_encode().into()
}
