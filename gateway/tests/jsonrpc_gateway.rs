//! Exercises `JsonRpcGateway` and `RemoteSigner` against an in-process mock
//! ledger node served by axum.

use axum::{extract::State, routing::post, Json, Router};
use pollchain_gateway::abi::{self, Token};
use pollchain_gateway::{
    ContractCall, JsonRpcGateway, LedgerError, LedgerGateway, ReadCall, ReadOutput,
    ReceiptStatus, RemoteSigner, TransactionRequest,
};
use pollchain_types::{Address, GasParams, PrivateKey, TxHash};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

#[derive(Default)]
struct MockNode {
    receipt_polls: AtomicUsize,
    raw_transactions: Mutex<Vec<String>>,
    signed_keys: Mutex<Vec<String>>,
    fail_send: bool,
}

async fn rpc(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let result = match req["method"].as_str().unwrap_or_default() {
        "eth_getTransactionCount" => {
            assert_eq!(req["params"][1], "pending");
            json!("0x7")
        }
        "eth_call" => {
            let data = abi::encode(&[
                Token::Array(vec![Token::String("Pet?".into())]),
                Token::Array(vec![Token::Array(vec![
                    Token::String("Cat".into()),
                    Token::String("Dog".into()),
                ])]),
            ]);
            json!(format!("0x{}", hex::encode(data)))
        }
        "eth_sendRawTransaction" => {
            if node.fail_send {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32000, "message": "nonce too low" },
                }));
            }
            node.raw_transactions
                .lock()
                .unwrap()
                .push(req["params"][0].as_str().unwrap().to_string());
            json!(TX_HASH)
        }
        "eth_getTransactionReceipt" => {
            if node.receipt_polls.fetch_add(1, Ordering::SeqCst) < 2 {
                Value::Null
            } else {
                json!({ "status": "0x1", "blockNumber": "0x2a", "gasUsed": "0x5208" })
            }
        }
        other => panic!("unexpected method {other}"),
    };
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

async fn sign(State(node): State<Arc<MockNode>>, Json(req): Json<Value>) -> Json<Value> {
    node.signed_keys
        .lock()
        .unwrap()
        .push(req["private_key"].as_str().unwrap().to_string());
    assert_eq!(req["transaction"]["nonce"], "0x7");
    Json(json!({ "raw_transaction": "0xf86b01" }))
}

async fn spawn_node(node: Arc<MockNode>) -> String {
    let app = Router::new()
        .route("/", post(rpc))
        .route("/sign", post(sign))
        .with_state(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn gateway(base: &str) -> JsonRpcGateway {
    let signer = RemoteSigner::new(format!("{base}/sign"), Duration::from_secs(5)).unwrap();
    JsonRpcGateway::new(
        format!("{base}/"),
        Address::new([0x42; 20]),
        Arc::new(signer),
        Duration::from_secs(5),
        Duration::from_millis(10),
    )
    .unwrap()
}

fn vote_request(nonce: u64) -> TransactionRequest {
    TransactionRequest {
        from: Address::new([0x01; 20]),
        call: ContractCall::Vote {
            poll_index: 0,
            option_index: 1,
        },
        gas: GasParams::from_gwei(200_000, 20),
        nonce,
        chain_id: 11_155_111,
    }
}

#[tokio::test]
async fn reads_nonce_and_polls() {
    let base = spawn_node(Arc::new(MockNode::default())).await;
    let gw = gateway(&base);

    assert_eq!(gw.get_nonce(&Address::new([1; 20])).await.unwrap(), 7);
    let out = gw.call_read_only(&ReadCall::GetAllPolls).await.unwrap();
    assert_eq!(
        out,
        ReadOutput::Polls {
            titles: vec!["Pet?".into()],
            options: vec![vec!["Cat".into(), "Dog".into()]],
        }
    );
}

#[tokio::test]
async fn submits_signed_transaction_and_polls_receipt() {
    let node = Arc::new(MockNode::default());
    let base = spawn_node(node.clone()).await;
    let gw = gateway(&base);
    let key = PrivateKey::new([0x0b; 32]);

    let hash = gw.submit_transaction(&vote_request(7), &key).await.unwrap();
    assert_eq!(hash, TX_HASH.parse::<TxHash>().unwrap());
    assert_eq!(*node.raw_transactions.lock().unwrap(), vec!["0xf86b01".to_string()]);
    assert_eq!(node.signed_keys.lock().unwrap()[0], key.expose_hex());

    let receipt = gw.await_confirmation(&hash).await.unwrap();
    assert_eq!(receipt.status, ReceiptStatus::Success);
    assert_eq!(receipt.block_number, Some(42));
    assert_eq!(node.receipt_polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn rpc_error_object_is_surfaced() {
    let node = Arc::new(MockNode {
        fail_send: true,
        ..Default::default()
    });
    let base = spawn_node(node).await;
    let gw = gateway(&base);

    let err = gw
        .submit_transaction(&vote_request(7), &PrivateKey::new([1; 32]))
        .await
        .unwrap_err();
    match err {
        LedgerError::Rpc { code, message } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "nonce too low");
        }
        other => panic!("expected rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_node_is_a_transport_error() {
    let gw = gateway("http://127.0.0.1:1");
    let err = gw.get_nonce(&Address::new([1; 20])).await.unwrap_err();
    assert!(matches!(err, LedgerError::Transport(_)));
}
