//! RPC error types and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pollchain_coordinator::CoordinatorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Failure of a write endpoint; rendered as `{"success": false, "error"}`.
    #[error(transparent)]
    Write(CoordinatorError),

    /// Failure of a read endpoint; rendered as `{"error"}`.
    #[error(transparent)]
    Read(CoordinatorError),

    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("metrics encoding failed: {0}")]
    Metrics(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Status code for a coordinator error: caller mistakes are 400, the rest 500.
pub fn status_for(err: &CoordinatorError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn message_for(err: &CoordinatorError) -> String {
    match err {
        CoordinatorError::Internal(detail) => {
            tracing::error!(%detail, "internal error");
            "internal error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RpcError::Write(err) => (
                status_for(err),
                serde_json::json!({ "success": false, "error": message_for(err) }),
            ),
            RpcError::Read(err) => (status_for(err), serde_json::json!({ "error": message_for(err) })),
            RpcError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "success": false, "error": self.to_string() }),
            ),
            RpcError::Metrics(_) | RpcError::Server(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
