//! Full request path: HTTP router -> coordinator and cache -> JSON-RPC
//! gateway and remote signer -> an in-process mock ledger node.
//!
//! The mock signer returns the transaction's calldata as the "raw"
//! transaction, so the mock node can apply it to its contract state.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use pollchain_gateway::abi::{self, ParamType, Token};
use pollchain_node::{PollService, ServiceConfig};
use pollchain_rpc::router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const ACCOUNT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

struct Chain {
    titles: Vec<String>,
    options: Vec<Vec<String>>,
    votes: Vec<Vec<u64>>,
    nonce: u64,
    calls: Vec<&'static str>,
}

type Shared = Arc<Mutex<Chain>>;

fn strings(items: &[String]) -> Token {
    Token::Array(items.iter().cloned().map(Token::String).collect())
}

fn hex_arg(value: &Value) -> Vec<u8> {
    let s = value.as_str().unwrap();
    hex::decode(s.trim_start_matches("0x")).unwrap()
}

fn apply(chain: &mut Chain, calldata: &[u8]) {
    let (selector, args) = calldata.split_at(4);
    if selector == abi::selector("vote(uint256,uint256)") {
        let tokens = abi::decode(&[ParamType::Uint, ParamType::Uint], args).unwrap();
        let poll = tokens[0].clone().into_uint().unwrap() as usize;
        let option = tokens[1].clone().into_uint().unwrap() as usize;
        chain.votes[poll][option] += 1;
    } else if selector == abi::selector("createPoll(string,string[])") {
        let types = [ParamType::String, ParamType::array(ParamType::String)];
        let mut tokens = abi::decode(&types, args).unwrap().into_iter();
        let title = tokens.next().unwrap().into_string().unwrap();
        let options: Vec<String> = tokens
            .next()
            .unwrap()
            .into_array()
            .unwrap()
            .into_iter()
            .map(|t| t.into_string().unwrap())
            .collect();
        chain.titles.push(title);
        chain.votes.push(vec![0; options.len()]);
        chain.options.push(options);
    } else {
        panic!("unknown selector {}", hex::encode(selector));
    }
}

async fn rpc(State(chain): State<Shared>, Json(req): Json<Value>) -> Json<Value> {
    let mut chain = chain.lock().unwrap();
    let result = match req["method"].as_str().unwrap() {
        "eth_getTransactionCount" => json!(format!("0x{:x}", chain.nonce)),
        "eth_call" => {
            let data = hex_arg(&req["params"][0]["data"]);
            let out = if data[..4] == abi::selector("getAllPolls()") {
                chain.calls.push("getAllPolls");
                abi::encode(&[
                    strings(&chain.titles),
                    Token::Array(chain.options.iter().map(|o| strings(o)).collect()),
                ])
            } else {
                chain.calls.push("getResults");
                let index = abi::decode(&[ParamType::Uint], &data[4..]).unwrap()[0]
                    .clone()
                    .into_uint()
                    .unwrap() as usize;
                let counts = chain.votes[index].iter().copied().map(Token::Uint).collect();
                abi::encode(&[Token::Array(counts)])
            };
            json!(format!("0x{}", hex::encode(out)))
        }
        "eth_sendRawTransaction" => {
            let calldata = hex_arg(&req["params"][0]);
            apply(&mut chain, &calldata);
            chain.nonce += 1;
            json!(format!("0x{:064x}", chain.nonce))
        }
        "eth_getTransactionReceipt" => {
            json!({ "status": "0x1", "blockNumber": "0x10", "gasUsed": "0x5208" })
        }
        other => panic!("unexpected method {other}"),
    };
    Json(json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }))
}

async fn sign(Json(req): Json<Value>) -> Json<Value> {
    assert_eq!(req["transaction"]["chainId"], "0xaa36a7");
    Json(json!({ "raw_transaction": req["transaction"]["data"] }))
}

async fn spawn_ledger(chain: Shared) -> String {
    let app = Router::new()
        .route("/", post(rpc))
        .route("/sign", post(sign))
        .with_state(chain);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn vote_and_create_through_json_rpc() {
    let chain = Arc::new(Mutex::new(Chain {
        titles: vec!["Pet?".into()],
        options: vec![vec!["Cat".into(), "Dog".into()]],
        votes: vec![vec![3, 5]],
        nonce: 0,
        calls: Vec::new(),
    }));
    let base = spawn_ledger(chain.clone()).await;

    let config = ServiceConfig {
        rpc_url: format!("{base}/"),
        signer_url: format!("{base}/sign"),
        contract_address: "0x1111111111111111111111111111111111111111".into(),
        receipt_poll_interval_ms: 10,
        ..Default::default()
    };
    let service = PollService::new(config).unwrap();
    let app = router(service.state().clone());

    let (status, results) = call(&app, get("/show_results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["Pet?"]["counts"], json!([3, 5]));

    let (status, body) = call(
        &app,
        post_json(
            "/cast_vote",
            json!({
                "poll_index": 0,
                "option_index": 1,
                "user_email": "a@x.com",
                "account": ACCOUNT,
                "private_key": KEY,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, results) = call(&app, get("/show_results")).await;
    assert_eq!(results["Pet?"]["counts"], json!([3, 6]));

    let (status, body) = call(
        &app,
        post_json(
            "/create_poll",
            json!({
                "poll_name": "Lunch?",
                "options": ["Soup", "Salad"],
                "account": ACCOUNT,
                "private_key": KEY,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, polls) = call(&app, get("/show_polls")).await;
    assert_eq!(polls["titles"], json!(["Pet?", "Lunch?"]));

    let chain = chain.lock().unwrap();
    assert_eq!(chain.nonce, 2);
    assert_eq!(
        chain.calls,
        vec!["getAllPolls", "getResults", "getResults", "getAllPolls"]
    );
}
