//! Fee-split payment relay.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/send
//!     ──────────────▶ http (axum + tower-http layers)
//!                        │
//!                        ▼
//!                     payments::processor ──▶ payments::split
//!                        │
//!                        ▼
//!                     blockchain
//!                       endpoint  → first live RPC endpoint
//!                       token     → decimals, balance, nonce, gas price
//!                       transaction → nonce N / N+1, gas policy
//!                       wallet    → sign with the custodial key
//!                       broadcast → recipient leg, then fee leg
//!                        │
//!                        ▼
//!     ◀────────────── per-leg hashes and errors
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use fee_split_relay::blockchain::Wallet;
use fee_split_relay::config::load_config;
use fee_split_relay::lifecycle::{shutdown_signal, Shutdown};
use fee_split_relay::observability::{logging, metrics};
use fee_split_relay::HttpServer;

#[derive(Parser)]
#[command(name = "fee-split-relay")]
#[command(about = "Relays ERC-20 payments with an on-chain fee split", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fee-split-relay starting");

    tracing::info!(
        path = ?args.config,
        bind_address = %config.listener.bind_address,
        network = %config.chain.network_name,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let wallet = Wallet::from_env(&config.wallet.private_key_env)?;
    let tls_enabled = config.listener.tls.is_some();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config, Arc::new(wallet))?;

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(serve(server, tls_enabled, bind_address, shutdown.subscribe()));

    tokio::select! {
        result = &mut server_task => {
            result??;
        }
        _ = shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(
    server: HttpServer,
    tls_enabled: bool,
    bind_address: String,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    if tls_enabled {
        let addr = bind_address
            .parse::<SocketAddr>()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}", e)))?;
        server.run_tls(addr, shutdown).await
    } else {
        let listener = TcpListener::bind(&bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Listening for connections");
        server.run(listener, shutdown).await
    }
}
