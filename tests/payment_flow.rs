//! End-to-end payment tests against a mock JSON-RPC node.

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{address, hex, keccak256, Address, U256};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

mod common;

use common::{NodeState, RECIPIENT};

const SENDER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

fn decode(raw: &[u8]) -> TxEnvelope {
    TxEnvelope::decode_2718(&mut &raw[..]).unwrap()
}

/// Split an ABI-encoded `transfer(address,uint256)` call.
fn transfer_args(input: &[u8]) -> (Address, U256) {
    assert_eq!(&input[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    assert_eq!(input.len(), 68);
    (
        Address::from_slice(&input[16..36]),
        U256::from_be_slice(&input[36..68]),
    )
}

#[tokio::test]
async fn test_successful_payment_splits_and_sequences() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "100" }),
    )
    .await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["status"], "success");
    assert_eq!(body["broadcast"], "both");
    assert_eq!(body["network"], "Local Test");
    assert_eq!(body["recipient_amount"], "98");
    assert_eq!(body["fee_amount"], "2");
    assert_eq!(body["recipient_units"], "98000000");
    assert_eq!(body["fee_units"], "2000000");
    assert_eq!(body["recipient_nonce"], 7);
    assert_eq!(body["fee_nonce"], 8);
    assert!(body["recipient_error"].is_null());
    assert!(body["fee_error"].is_null());

    let raw = common::raw_txs(&node);
    assert_eq!(raw.len(), 2);
    assert_eq!(
        body["recipient_tx_hash"].as_str().unwrap(),
        format!("0x{}", hex::encode(keccak256(&raw[0])))
    );
    assert_eq!(
        body["fee_tx_hash"].as_str().unwrap(),
        format!("0x{}", hex::encode(keccak256(&raw[1])))
    );

    let token: Address = common::TOKEN.parse().unwrap();
    let fee_address: Address = common::FEE_ADDRESS.parse().unwrap();
    let recipient: Address = RECIPIENT.parse().unwrap();

    let recipient_tx = decode(&raw[0]);
    let fee_tx = decode(&raw[1]);
    for tx in [&recipient_tx, &fee_tx] {
        assert_eq!(tx.to(), Some(token));
        assert_eq!(tx.chain_id(), Some(common::TEST_CHAIN_ID));
        assert_eq!(tx.gas_limit(), 100_000);
        // 30 gwei quoted, 1.2x applied
        assert_eq!(tx.gas_price(), Some(36_000_000_000));
        assert_eq!(tx.value(), U256::ZERO);
        assert_eq!(tx.recover_signer().unwrap(), SENDER);
    }
    assert_eq!(recipient_tx.nonce(), 7);
    assert_eq!(fee_tx.nonce(), 8);
    assert_eq!(
        transfer_args(recipient_tx.input()),
        (recipient, U256::from(98_000_000u64))
    );
    assert_eq!(
        transfer_args(fee_tx.input()),
        (fee_address, U256::from(2_000_000u64))
    );

    assert_eq!(
        common::methods(&node),
        vec![
            "eth_chainId",
            "eth_call",
            "eth_call",
            "eth_getTransactionCount",
            "eth_gasPrice",
            "eth_sendRawTransaction",
            "eth_sendRawTransaction",
        ]
    );

    relay.shutdown.trigger();
}

#[tokio::test]
async fn test_numeric_amount_accepted() {
    let (node_url, _node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": 12.5 }),
    )
    .await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["recipient_amount"], "12.25");
    assert_eq!(body["fee_amount"], "0.25");
}

#[tokio::test]
async fn test_failover_skips_dead_endpoint() {
    let dead = common::dead_endpoint().await;
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![dead, node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(common::raw_txs(&node).len(), 2);
}

#[tokio::test]
async fn test_wrong_chain_endpoint_skipped() {
    let (wrong_url, wrong) = common::start_mock_node(NodeState {
        chain_id: 1,
        ..NodeState::default()
    })
    .await;
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![wrong_url, node_url])).await;

    let (status, _) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(common::methods(&wrong), vec!["eth_chainId"]);
    assert_eq!(common::raw_txs(&node).len(), 2);
}

#[tokio::test]
async fn test_all_endpoints_down_is_service_unavailable() {
    let endpoints = vec![common::dead_endpoint().await, common::dead_endpoint().await];
    let relay = common::start_relay(common::relay_config(endpoints)).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 503);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("2"));
}

#[tokio::test]
async fn test_recipient_leg_failure_still_sends_fee() {
    let (node_url, node) = common::start_mock_node(NodeState {
        fail_sends: HashSet::from([0]),
        ..NodeState::default()
    })
    .await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "50" }),
    )
    .await;

    assert_eq!(status, 502);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["broadcast"], "fee_only");
    assert!(body["recipient_tx_hash"].is_null());
    assert!(body["recipient_error"]
        .as_str()
        .unwrap()
        .contains("underpriced"));
    assert!(body["fee_tx_hash"].is_string());
    assert_eq!(body["fee_nonce"], 8);

    let accepted = common::raw_txs(&node);
    assert_eq!(accepted.len(), 1);
    assert_eq!(decode(&accepted[0]).nonce(), 8);
}

#[tokio::test]
async fn test_fee_leg_failure_is_partial() {
    let (node_url, _node) = common::start_mock_node(NodeState {
        fail_sends: HashSet::from([1]),
        ..NodeState::default()
    })
    .await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "50" }),
    )
    .await;

    assert_eq!(status, 502);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["broadcast"], "recipient_only");
    assert!(body["recipient_tx_hash"].is_string());
    assert!(body["fee_error"].is_string());
}

#[tokio::test]
async fn test_both_legs_rejected() {
    let (node_url, node) = common::start_mock_node(NodeState {
        fail_sends: HashSet::from([0, 1]),
        ..NodeState::default()
    })
    .await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "50" }),
    )
    .await;

    assert_eq!(status, 502);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["broadcast"], "neither");
    assert!(common::raw_txs(&node).is_empty());
}

#[tokio::test]
async fn test_invalid_address_never_reaches_chain() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": "0x1234", "amount": "10" }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");
    assert!(common::methods(&node).is_empty());
}

#[tokio::test]
async fn test_bad_checksum_rejected() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    // Correct checksum is 0x70997970C51812dc3A010C7d01b50e0d17dc79C8
    let (status, _) = common::send_payment(
        &relay,
        json!({ "recipient_address": "0x70997970C51812DC3A010C7d01b50e0d17dc79C8", "amount": "10" }),
    )
    .await;

    assert_eq!(status, 400);
    assert!(common::methods(&node).is_empty());
}

#[tokio::test]
async fn test_invalid_amounts_rejected() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let amounts = [
        json!("0"),
        json!("-5"),
        json!("abc"),
        json!(-1),
        json!(null),
        json!(true),
        json!({ "value": 1 }),
    ];
    for amount in amounts {
        let (status, body) = common::send_payment(
            &relay,
            json!({ "recipient_address": RECIPIENT, "amount": amount }),
        )
        .await;
        assert_eq!(status, 400, "amount {} body {}", amount, body);
        assert_eq!(body["status"], "error");
    }

    let (status, body) =
        common::send_payment(&relay, json!({ "recipient_address": RECIPIENT })).await;
    assert_eq!(status, 400, "body {}", body);
    assert_eq!(body["status"], "error");

    assert!(common::methods(&node).is_empty());
}

#[tokio::test]
async fn test_dust_amount_rejected_after_decimals_lookup() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    // Below one unit of a 6-decimal token
    let (status, _) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "0.0000001" }),
    )
    .await;

    assert_eq!(status, 400);
    assert!(common::raw_txs(&node).is_empty());
}

#[tokio::test]
async fn test_insufficient_balance_rejected() {
    let (node_url, node) = common::start_mock_node(NodeState {
        balance: U256::from(5_000_000u64),
        ..NodeState::default()
    })
    .await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 422);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("5"), "message: {}", message);
    assert!(message.contains("10"), "message: {}", message);
    assert!(common::raw_txs(&node).is_empty());
}

#[tokio::test]
async fn test_gas_price_above_cap_rejected() {
    let (node_url, node) = common::start_mock_node(NodeState {
        gas_price: 6_000_000_000_000,
        ..NodeState::default()
    })
    .await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let (status, _) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 503);
    assert!(common::raw_txs(&node).is_empty());
}

#[tokio::test]
async fn test_concurrent_payments_never_share_nonces() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let body = json!({ "recipient_address": RECIPIENT, "amount": "1" });
    let (a, b, c) = tokio::join!(
        common::send_payment(&relay, body.clone()),
        common::send_payment(&relay, body.clone()),
        common::send_payment(&relay, body.clone()),
    );
    for (status, body) in [a, b, c] {
        assert_eq!(status, 200, "body: {}", body);
    }

    let nonces: HashSet<u64> = common::raw_txs(&node)
        .iter()
        .map(|raw| decode(raw).nonce())
        .collect();
    assert_eq!(nonces, (7..13).collect::<HashSet<u64>>());
}

#[tokio::test]
async fn test_malformed_body_gets_error_json() {
    let (node_url, _node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let res = reqwest::Client::new()
        .post(relay.url("/api/send"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_health_and_request_id() {
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let relay = common::start_relay(common::relay_config(vec![node_url])).await;

    let res = reqwest::get(relay.url("/health")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "operational");
    assert_eq!(body["network"], "Local Test");
    assert_eq!(body["sender"], SENDER.to_checksum(None));
    assert!(common::methods(&node).is_empty());
}

#[tokio::test]
async fn test_slow_broadcast_still_reports_both_legs() {
    let (node_url, node) = common::start_mock_node(NodeState {
        delays: HashMap::from([("eth_sendRawTransaction", Duration::from_millis(700))]),
        ..NodeState::default()
    })
    .await;
    let mut config = common::relay_config(vec![node_url]);
    // Shorter than the two broadcasts together
    config.timeouts.request_secs = 1;
    let relay = common::start_relay(config).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "100" }),
    )
    .await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["broadcast"], "both");
    assert!(body["recipient_tx_hash"].is_string());
    assert!(body["fee_tx_hash"].is_string());
    assert_eq!(common::raw_txs(&node).len(), 2);
}

#[tokio::test]
async fn test_lock_wait_is_bounded_by_request_budget() {
    let (node_url, node) = common::start_mock_node(NodeState {
        delays: HashMap::from([("eth_sendRawTransaction", Duration::from_millis(1500))]),
        ..NodeState::default()
    })
    .await;
    let mut config = common::relay_config(vec![node_url]);
    config.timeouts.request_secs = 1;
    let relay = common::start_relay(config).await;

    let body = json!({ "recipient_address": RECIPIENT, "amount": "5" });
    let first = common::send_payment(&relay, body.clone());
    let second = async {
        // Arrive while the first payment holds the sender lock
        tokio::time::sleep(Duration::from_millis(300)).await;
        common::send_payment(&relay, body.clone()).await
    };
    let ((first_status, first_body), (second_status, second_body)) = tokio::join!(first, second);

    assert_eq!(first_status, 200, "body: {}", first_body);
    assert_eq!(second_status, 504, "body: {}", second_body);
    assert_eq!(second_body["status"], "error");
    assert!(second_body["message"]
        .as_str()
        .unwrap()
        .contains("nothing was signed"));
    assert_eq!(common::raw_txs(&node).len(), 2);
}

#[tokio::test]
async fn test_hanging_endpoint_is_skipped_within_rpc_timeout() {
    let (hanging_url, hanging) = common::start_mock_node(NodeState {
        hang: HashSet::from(["eth_chainId"]),
        ..NodeState::default()
    })
    .await;
    let (node_url, node) = common::start_mock_node(NodeState::default()).await;
    let mut config = common::relay_config(vec![hanging_url, node_url]);
    config.chain.rpc_timeout_secs = 1;
    let relay = common::start_relay(config).await;

    let started = Instant::now();
    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 200, "body: {}", body);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(common::methods(&hanging), vec!["eth_chainId"]);
    assert_eq!(common::raw_txs(&node).len(), 2);
}

#[tokio::test]
async fn test_hanging_gas_price_fails_before_signing() {
    let (node_url, node) = common::start_mock_node(NodeState {
        hang: HashSet::from(["eth_gasPrice"]),
        ..NodeState::default()
    })
    .await;
    let mut config = common::relay_config(vec![node_url]);
    config.chain.rpc_timeout_secs = 1;
    let relay = common::start_relay(config).await;

    let (status, body) = common::send_payment(
        &relay,
        json!({ "recipient_address": RECIPIENT, "amount": "10" }),
    )
    .await;

    assert_eq!(status, 502, "body: {}", body);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("eth_gasPrice"));
    assert!(!common::methods(&node)
        .iter()
        .any(|m| m == "eth_sendRawTransaction"));
}
