//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, CORS, timeouts)
//! - Bind server to listener, plain or TLS
//! - Stop accepting on shutdown and drain in-flight payments

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::wallet::TransactionSigner;
use crate::config::RelayConfig;
use crate::http::handlers::{health, submit_payment};
use crate::http::request::MakeRequestUuidV4;
use crate::net::tls::load_tls_config;
use crate::payments::processor::PaymentProcessor;
use crate::payments::types::PaymentError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<PaymentProcessor>,
}

/// HTTP server for the payment relay.
pub struct HttpServer {
    router: Router,
    config: Arc<RelayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and signer.
    pub fn new(config: RelayConfig, signer: Arc<dyn TransactionSigner>) -> Result<Self, PaymentError> {
        let config = Arc::new(config);
        let processor = Arc::new(PaymentProcessor::new(config.clone(), signer)?);

        tracing::info!(
            network = %config.chain.network_name,
            chain_id = config.chain.chain_id,
            sender = %processor.sender(),
            endpoints = config.chain.endpoints.len(),
            fee_rate_bps = config.fees.fee_rate_bps,
            "Payment processor ready"
        );

        let state = AppState { processor };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let cors = if config.security.cors_permissive {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };

        // `/api/send` bounds its own pre-signing phase and is never cut off
        // once a pair is signed.
        let health_routes = Router::new()
            .route("/health", get(health))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/api/send", post(submit_payment))
            .merge(health_routes)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(cors)
    }

    /// Run the server on a plain TCP listener until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS using the configured certificate and key.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let tls = self.config.listener.tls.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "TLS is not configured")
        })?;
        let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        // Long enough for a payment that was just admitted to finish both legs.
        let drain_secs = self.config.timeouts.request_secs + 2 * self.config.chain.rpc_timeout_secs;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            drain.graceful_shutdown(Some(Duration::from_secs(drain_secs)));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
