//! Request handlers and their JSON bodies.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Json};
use pollchain_coordinator::tracing_spans::rpc_span;
use pollchain_coordinator::{CastVoteRequest, CoordinatorError, CreatePollRequest};
use pollchain_types::{ResultsEntry, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::Instrument;

use crate::{AppState, RpcError};

// ── Writes ───────────────────────────────────────────────────────────────

/// Missing fields deserialize as absent and are reported by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePollBody {
    #[serde(alias = "pollName")]
    pub poll_name: Option<String>,
    pub options: Option<Vec<String>>,
    pub account: Option<String>,
    #[serde(alias = "privateKey")]
    pub private_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CastVoteBody {
    #[serde(alias = "pollIndex")]
    pub poll_index: Option<u64>,
    #[serde(alias = "optionIndex")]
    pub option_index: Option<u64>,
    #[serde(alias = "userId", alias = "user_id")]
    pub user_email: Option<String>,
    pub account: Option<String>,
    #[serde(alias = "privateKey")]
    pub private_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub success: bool,
    pub tx_hash: String,
}

impl From<TxHash> for TxResponse {
    fn from(hash: TxHash) -> Self {
        Self {
            success: true,
            tx_hash: hash.to_string(),
        }
    }
}

// ── Reads ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PollsResponse {
    pub titles: Vec<String>,
    pub options: Vec<Vec<String>>,
}

/// Poll title to tally. A title shared by several polls maps to the last one.
pub type ResultsResponse = BTreeMap<String, ResultsEntry>;

pub async fn create_poll(
    State(state): State<AppState>,
    body: Result<Json<CreatePollBody>, JsonRejection>,
) -> Result<Json<TxResponse>, RpcError> {
    let Json(body) = body.map_err(|e| RpcError::BadRequest(e.body_text()))?;
    let request = CreatePollRequest {
        title: body.poll_name.unwrap_or_default(),
        options: body.options.unwrap_or_default(),
        account: body.account.unwrap_or_default(),
        private_key: body.private_key.unwrap_or_default(),
    };
    let hash = state
        .coordinator
        .create_poll(request)
        .instrument(rpc_span("create_poll"))
        .await
        .map_err(RpcError::Write)?;
    Ok(Json(hash.into()))
}

pub async fn cast_vote(
    State(state): State<AppState>,
    body: Result<Json<CastVoteBody>, JsonRejection>,
) -> Result<Json<TxResponse>, RpcError> {
    let Json(body) = body.map_err(|e| RpcError::BadRequest(e.body_text()))?;
    let request = CastVoteRequest {
        poll_index: body.poll_index,
        option_index: body.option_index,
        voter: body.user_email.unwrap_or_default(),
        account: body.account.unwrap_or_default(),
        private_key: body.private_key.unwrap_or_default(),
    };
    let hash = state
        .coordinator
        .cast_vote(request)
        .instrument(rpc_span("cast_vote"))
        .await
        .map_err(RpcError::Write)?;
    Ok(Json(hash.into()))
}

pub async fn show_polls(State(state): State<AppState>) -> Result<Json<PollsResponse>, RpcError> {
    let polls = state
        .cache
        .get_polls()
        .instrument(rpc_span("show_polls"))
        .await
        .map_err(|e| RpcError::Read(CoordinatorError::from(e)))?;
    Ok(Json(PollsResponse {
        titles: polls.titles().to_vec(),
        options: polls.options().to_vec(),
    }))
}

pub async fn show_results(
    State(state): State<AppState>,
) -> Result<Json<ResultsResponse>, RpcError> {
    let all = state
        .cache
        .get_all_results()
        .instrument(rpc_span("show_results"))
        .await
        .map_err(|e| RpcError::Read(CoordinatorError::from(e)))?;
    let results = all
        .into_iter()
        .map(|(title, entry)| (title, ResultsEntry::clone(&entry)))
        .collect();
    Ok(Json(results))
}

// ── Operations ───────────────────────────────────────────────────────────

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let metrics = state.coordinator.metrics();
    metrics.observe_cache(state.cache.stats());
    let text = metrics
        .encode()
        .map_err(|e| RpcError::Metrics(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
