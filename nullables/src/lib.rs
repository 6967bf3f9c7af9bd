//! Nullable infrastructure for deterministic testing.
//!
//! The ledger is the only external dependency the core talks to, and it is
//! abstracted behind [`pollchain_gateway::LedgerGateway`]. This crate provides a
//! test-friendly implementation that:
//! - Keeps contract state in memory
//! - Can be scripted to revert, fail or hang programmatically
//! - Counts every call so tests can assert the ledger was (not) contacted
//! - Never touches the network
//!
//! Usage: swap the JSON-RPC gateway for [`NullLedger`] in tests.

pub mod ledger;

pub use ledger::{NullLedger, Outcome};
