//! Poll service runtime: configuration, logging, shutdown and the wiring of
//! ledger client, cache, coordinator and HTTP server.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use logging::{init_logging, LogFormat};
pub use service::PollService;
pub use shutdown::ShutdownController;
