use pollchain_cache::CacheError;
use pollchain_types::{PollIndex, TxHash, VoterId};
use thiserror::Error;
use tracing::error;

/// Every failure a caller of the coordinator can see. Ledger and transport
/// errors are folded into these kinds before they leave the crate.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{voter} has already voted in poll {poll_index}")]
    AlreadyVoted { poll_index: PollIndex, voter: VoterId },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("transaction {tx_hash} was reverted")]
    TransactionReverted { tx_hash: TxHash },

    #[error("transaction failed: {0}")]
    TransactionError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Errors raised before the ledger was contacted for a write.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::AlreadyVoted { .. })
    }
}

impl From<CacheError> for CoordinatorError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::LedgerUnavailable(e) => Self::LedgerUnavailable(e.to_string()),
            CacheError::UnknownPoll(index) => {
                Self::InvalidInput(format!("poll index {index} is out of range"))
            }
            CacheError::Inconsistent(message) => {
                error!(%message, "cache defect");
                Self::Internal(message)
            }
        }
    }
}
