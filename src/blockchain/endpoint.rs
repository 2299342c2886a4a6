//! Chain endpoint selection with ordered failover.
//!
//! # Responsibilities
//! - Probe configured JSON-RPC endpoints in priority order
//! - Bind the request to the first endpoint that answers with the right chain ID
//! - Bound every RPC call made through the session with the configured timeout
//!
//! # Design Decisions
//! - Stateless: every request re-probes from the top of the list, so a
//!   recovered primary is picked up immediately
//! - No retry within a candidate; a failed probe moves on to the next one

use alloy::providers::{Provider, ProviderBuilder};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainConfig, ChainId};
use crate::observability::metrics;

/// Provider handle shared by everything bound to one endpoint.
pub type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Picks the first live endpoint out of the configured list.
#[derive(Debug, Clone)]
pub struct ChainEndpointSelector {
    endpoints: Vec<String>,
    chain_id: ChainId,
    timeout_duration: Duration,
}

impl ChainEndpointSelector {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            chain_id: ChainId(config.chain_id),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        }
    }

    /// Probe candidates in order and return a session on the first live one.
    pub async fn select_endpoint(&self) -> BlockchainResult<ChainSession> {
        for (i, candidate) in self.endpoints.iter().enumerate() {
            let url: Url = match candidate.parse() {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(provider_idx = i, error = %e, "Ignoring invalid RPC URL");
                    continue;
                }
            };
            let label = endpoint_label(&url);

            match self.probe(url).await {
                Ok(session) => {
                    metrics::record_endpoint_probe(&label, true);
                    tracing::debug!(provider_idx = i, endpoint = %label, "Selected chain endpoint");
                    return Ok(session);
                }
                Err(e) => {
                    metrics::record_endpoint_probe(&label, false);
                    tracing::warn!(
                        provider_idx = i,
                        endpoint = %label,
                        error = %e,
                        "Endpoint failed liveness probe, trying next provider"
                    );
                }
            }
        }

        Err(BlockchainError::NoEndpointAvailable {
            tried: self.endpoints.len(),
        })
    }

    async fn probe(&self, url: Url) -> BlockchainResult<ChainSession> {
        let label = endpoint_label(&url);
        let provider: SharedProvider = Arc::new(ProviderBuilder::new().connect_http(url));
        let session = ChainSession {
            label,
            provider,
            chain_id: self.chain_id,
            timeout_duration: self.timeout_duration,
        };

        let actual = session
            .timed("eth_chainId", session.provider.get_chain_id())
            .await?;
        if actual != self.chain_id.0 {
            return Err(BlockchainError::ChainMismatch {
                expected: self.chain_id.0,
                actual,
            });
        }

        Ok(session)
    }
}

/// A request-scoped connection to one verified endpoint.
#[derive(Clone)]
pub struct ChainSession {
    label: String,
    provider: SharedProvider,
    chain_id: ChainId,
    timeout_duration: Duration,
}

impl ChainSession {
    /// Host (and port) of the endpoint, safe to log.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn provider(&self) -> &(dyn Provider + Send + Sync) {
        self.provider.as_ref()
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Run an RPC future under the session timeout, mapping failures to
    /// [`BlockchainError::ChainQuery`].
    pub async fn timed<T, E, F>(&self, query: &'static str, fut: F) -> BlockchainResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BlockchainError::query(query, e)),
            Err(_) => Err(BlockchainError::query(
                query,
                format!("timed out after {}s", self.timeout_duration.as_secs()),
            )),
        }
    }

    pub(crate) fn timeout_duration(&self) -> Duration {
        self.timeout_duration
    }
}

impl std::fmt::Debug for ChainSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSession")
            .field("endpoint", &self.label)
            .field("chain_id", &self.chain_id.0)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

/// Host[:port] of an endpoint URL. Paths and query strings often carry
/// provider API keys, so they are left out of logs and metric labels.
pub fn endpoint_label(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => "unknown".to_string(),
    }
}
