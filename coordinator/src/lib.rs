//! Transaction lifecycle for poll writes.
//!
//! Each write runs `Validating -> Submitted -> Confirmed | Reverted | Failed`.
//! The cache is mutated only on `Confirmed`.

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod tracing_spans;
pub mod validate;

pub use coordinator::{CastVoteRequest, CreatePollRequest, TransactionCoordinator, TxOutcome};
pub use error::CoordinatorError;
pub use metrics::CoordinatorMetrics;
