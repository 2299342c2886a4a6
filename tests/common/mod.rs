//! Shared utilities for integration testing: a programmable mock JSON-RPC
//! node and helpers to run the relay against it.

#![allow(dead_code)]

use alloy::primitives::{hex, keccak256, B256, U256};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use fee_split_relay::blockchain::Wallet;
use fee_split_relay::config::RelayConfig;
use fee_split_relay::http::HttpServer;
use fee_split_relay::lifecycle::Shutdown;

/// Anvil's first development key.
pub const SENDER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_CHAIN_ID: u64 = 31337;
pub const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const FEE_ADDRESS: &str = "0x2b01e2c0024aaf8362a11f91a545f24cb5e5261f";
pub const RECIPIENT: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

const DECIMALS_SELECTOR: &str = "313ce567";
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Behaviour and observations of one mock node.
#[derive(Debug)]
pub struct NodeState {
    pub chain_id: u64,
    pub decimals: u8,
    pub balance: U256,
    pub nonce: u64,
    pub gas_price: u128,
    /// Indices (0-based) of `eth_sendRawTransaction` calls to reject.
    pub fail_sends: HashSet<usize>,
    /// Methods answered only after the given delay.
    pub delays: HashMap<&'static str, Duration>,
    /// Methods that accept the request and never answer.
    pub hang: HashSet<&'static str>,
    pub methods: Vec<String>,
    pub raw_txs: Vec<Vec<u8>>,
    pub send_calls: usize,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            chain_id: TEST_CHAIN_ID,
            decimals: 6,
            balance: U256::from(1_000_000_000_000u64),
            nonce: 7,
            gas_price: 30_000_000_000,
            fail_sends: HashSet::new(),
            delays: HashMap::new(),
            hang: HashSet::new(),
            methods: Vec::new(),
            raw_txs: Vec::new(),
            send_calls: 0,
        }
    }
}

pub type SharedNode = Arc<Mutex<NodeState>>;

/// JSON-RPC methods the node has seen, in order.
pub fn methods(node: &SharedNode) -> Vec<String> {
    node.lock().unwrap().methods.clone()
}

/// Raw transactions the node accepted, in order.
pub fn raw_txs(node: &SharedNode) -> Vec<Vec<u8>> {
    node.lock().unwrap().raw_txs.clone()
}

/// Start a mock node on an ephemeral port. Returns its URL and state handle.
pub async fn start_mock_node(state: NodeState) -> (String, SharedNode) {
    let shared: SharedNode = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/", post(handle_rpc))
        .with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{}", addr), shared)
}

/// URL of a local port nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn handle_rpc(State(state): State<SharedNode>, Json(request): Json<Value>) -> Json<Value> {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    let (delay, hang) = {
        let mut node = state.lock().unwrap();
        node.methods.push(method.clone());
        (
            node.delays.get(method.as_str()).copied(),
            node.hang.contains(method.as_str()),
        )
    };
    if hang {
        std::future::pending::<()>().await;
    }
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut node = state.lock().unwrap();

    let result: Result<Value, &str> = match method.as_str() {
        "eth_chainId" => Ok(json!(format!("0x{:x}", node.chain_id))),
        "eth_getTransactionCount" => Ok(json!(format!("0x{:x}", node.nonce))),
        "eth_gasPrice" => Ok(json!(format!("0x{:x}", node.gas_price))),
        "eth_call" => {
            let input = params[0]["input"]
                .as_str()
                .or_else(|| params[0]["data"].as_str())
                .unwrap_or_default()
                .trim_start_matches("0x")
                .to_string();
            let word = if input.starts_with(DECIMALS_SELECTOR) {
                Some(U256::from(node.decimals))
            } else if input.starts_with(BALANCE_OF_SELECTOR) {
                Some(node.balance)
            } else {
                None
            };
            match word {
                Some(word) => Ok(json!(format!("0x{}", hex::encode(B256::from(word))))),
                None => Err("execution reverted"),
            }
        }
        "eth_sendRawTransaction" => {
            let index = node.send_calls;
            node.send_calls += 1;
            let raw = hex::decode(params[0].as_str().unwrap_or_default()).unwrap_or_default();
            if node.fail_sends.contains(&index) {
                Err("replacement transaction underpriced")
            } else {
                let hash = keccak256(&raw);
                node.raw_txs.push(raw);
                node.nonce += 1;
                Ok(json!(format!("0x{}", hex::encode(hash))))
            }
        }
        _ => Err("method not found"),
    };

    Json(match result {
        Ok(value) => json!({ "jsonrpc": "2.0", "id": id, "result": value }),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": message }
        }),
    })
}

/// Relay config pointed at the given endpoints.
pub fn relay_config(endpoints: Vec<String>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.chain.network_name = "Local Test".to_string();
    config.chain.endpoints = endpoints;
    config.chain.chain_id = TEST_CHAIN_ID;
    config.chain.token_address = TOKEN.to_string();
    config.chain.rpc_timeout_secs = 2;
    config.fees.fee_address = FEE_ADDRESS.to_string();
    config.fees.fee_rate_bps = 200;
    config
}

/// A relay running in the background.
pub struct RunningRelay {
    pub base_url: String,
    pub shutdown: Shutdown,
}

impl RunningRelay {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start the relay on an ephemeral port with the test sender key.
pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    let wallet = Wallet::from_private_key(SENDER_KEY).unwrap();
    let server = HttpServer::new(config, Arc::new(wallet)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    RunningRelay {
        base_url: format!("http://{}", addr),
        shutdown,
    }
}

/// POST a payment and return the status code and JSON body.
pub async fn send_payment(relay: &RunningRelay, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(relay.url("/api/send"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    let json = res.json::<Value>().await.unwrap();
    (status, json)
}
