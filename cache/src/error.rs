use pollchain_gateway::LedgerError;
use pollchain_types::PollIndex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    #[error("poll {0} does not exist")]
    UnknownPoll(PollIndex),

    /// Ledger data that cannot be cached as-is. Always a defect, never retried
    /// silently.
    #[error("inconsistent ledger data: {0}")]
    Inconsistent(String),
}
