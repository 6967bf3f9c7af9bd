//! Span constructors shared by the coordinator and the HTTP layer.

use pollchain_types::PollIndex;
use tracing::{info_span, Span};

/// One create-poll workflow.
pub fn create_poll_span() -> Span {
    info_span!("create_poll")
}

/// One cast-vote workflow.
pub fn cast_vote_span(poll_index: PollIndex) -> Span {
    info_span!("cast_vote", poll_index)
}

/// A single call against the ledger.
pub fn ledger_call_span(method: &str) -> Span {
    info_span!("ledger_call", method = %method)
}

/// A single HTTP request.
pub fn rpc_span(route: &str) -> Span {
    info_span!("rpc", route = %route)
}
