//! HTTP server for the poll service.
//!
//! Routes:
//! - `POST /create_poll`, `POST /cast_vote`: writes through the coordinator
//! - `GET /show_polls`, `GET /show_results`: reads through the cache
//! - `GET /metrics`: Prometheus text format
//! - `GET /health`

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
