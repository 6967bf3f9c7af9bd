//! Axum-based HTTP server.

use axum::routing::{get, post};
use axum::Router;
use pollchain_cache::PollCache;
use pollchain_coordinator::TransactionCoordinator;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{handlers, RpcError};

/// Shared by every handler. The cache is the one the coordinator writes to.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<TransactionCoordinator>,
    pub cache: Arc<PollCache>,
}

impl AppState {
    pub fn new(coordinator: Arc<TransactionCoordinator>) -> Self {
        let cache = Arc::clone(coordinator.cache());
        Self { coordinator, cache }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/create_poll", post(handlers::create_poll))
        .route("/cast_vote", post(handlers::cast_vote))
        .route("/show_polls", get(handlers::show_polls))
        .route("/show_results", get(handlers::show_results))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: AppState,
}

impl RpcServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!(%addr, "HTTP server listening");
        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("HTTP server stopped");
        Ok(())
    }
}
