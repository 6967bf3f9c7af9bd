//! The create-poll and cast-vote workflows.

use pollchain_cache::PollCache;
use pollchain_gateway::{ContractCall, LedgerGateway, Receipt, TransactionRequest};
use pollchain_types::{
    Address, GasParams, OptionIndex, PollIndex, PrivateKey, TransactionParams, TxHash, VoterId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::tracing_spans::{cast_vote_span, create_poll_span, ledger_call_span};
use crate::{validate, CoordinatorError, CoordinatorMetrics};

const CREATE_POLL: &str = "create_poll";
const CAST_VOTE: &str = "cast_vote";

type AccountLocks = parking_lot::Mutex<HashMap<Address, Arc<tokio::sync::Mutex<()>>>>;

/// Raw create-poll input as received from a caller.
#[derive(Clone, Default)]
pub struct CreatePollRequest {
    pub title: String,
    pub options: Vec<String>,
    pub account: String,
    pub private_key: String,
}

/// Raw cast-vote input as received from a caller. Missing indices are
/// reported as invalid input.
#[derive(Clone, Default)]
pub struct CastVoteRequest {
    pub poll_index: Option<PollIndex>,
    pub option_index: Option<OptionIndex>,
    pub voter: String,
    pub account: String,
    pub private_key: String,
}

/// Terminal state of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Confirmed,
    Reverted,
    Failed,
}

impl TxOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Reverted => "reverted",
            Self::Failed => "failed",
        }
    }
}

/// Runs poll writes against the ledger and applies their effects to the cache
/// once, and only once, the ledger confirms them.
pub struct TransactionCoordinator {
    gateway: Arc<dyn LedgerGateway>,
    cache: Arc<PollCache>,
    params: TransactionParams,
    confirmation_timeout: Duration,
    /// Serializes nonce lookup and submission per source account. Entries
    /// live only while a submission for the account is queued or running.
    account_locks: AccountLocks,
    metrics: CoordinatorMetrics,
}

impl TransactionCoordinator {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        cache: Arc<PollCache>,
        params: TransactionParams,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            cache,
            params,
            confirmation_timeout,
            account_locks: parking_lot::Mutex::new(HashMap::new()),
            metrics: CoordinatorMetrics::new(),
        }
    }

    pub fn cache(&self) -> &Arc<PollCache> {
        &self.cache
    }

    pub fn params(&self) -> &TransactionParams {
        &self.params
    }

    pub fn metrics(&self) -> &CoordinatorMetrics {
        &self.metrics
    }

    /// Create a poll. On confirmation the poll list and every tally are
    /// invalidated and the transaction hash is returned.
    pub async fn create_poll(&self, request: CreatePollRequest) -> Result<TxHash, CoordinatorError> {
        self.run_create_poll(request)
            .instrument(create_poll_span())
            .await
    }

    /// Cast a vote. On confirmation the voter is recorded and the poll's
    /// tally is invalidated in one cache mutation.
    pub async fn cast_vote(&self, request: CastVoteRequest) -> Result<TxHash, CoordinatorError> {
        let poll_index = validate::required(request.poll_index, "poll_index")
            .map_err(|e| self.rejected(CAST_VOTE, e))?;
        self.run_cast_vote(poll_index, request)
            .instrument(cast_vote_span(poll_index))
            .await
    }

    async fn run_create_poll(&self, request: CreatePollRequest) -> Result<TxHash, CoordinatorError> {
        let (title, options, from, key) =
            validate_create(&request).map_err(|e| self.rejected(CREATE_POLL, e))?;
        debug!(options = options.len(), "create poll validated");

        let call = ContractCall::CreatePoll { title, options };
        let receipt = self
            .execute(CREATE_POLL, from, &key, call, self.params.create_poll)
            .await?;

        self.cache.invalidate_all();
        info!(tx_hash = %receipt.tx_hash, "poll created");
        Ok(receipt.tx_hash)
    }

    async fn run_cast_vote(
        &self,
        poll_index: PollIndex,
        request: CastVoteRequest,
    ) -> Result<TxHash, CoordinatorError> {
        let (option_index, voter, from, key) =
            validate_vote(&request).map_err(|e| self.rejected(CAST_VOTE, e))?;

        if self.cache.has_voted(poll_index, &voter) {
            debug!("duplicate vote stopped locally");
            return Err(self.rejected(
                CAST_VOTE,
                CoordinatorError::AlreadyVoted { poll_index, voter },
            ));
        }

        let polls = self.cache.get_polls().await?;
        let option_count = polls
            .options_of(poll_index)
            .map(|options| options.len() as u64)
            .ok_or_else(|| {
                self.rejected(
                    CAST_VOTE,
                    CoordinatorError::InvalidInput(format!(
                        "poll index {poll_index} is out of range"
                    )),
                )
            })?;
        if option_index >= option_count {
            return Err(self.rejected(
                CAST_VOTE,
                CoordinatorError::InvalidInput(format!(
                    "option index {option_index} is out of range"
                )),
            ));
        }

        let call = ContractCall::Vote {
            poll_index,
            option_index,
        };
        let receipt = self
            .execute(CAST_VOTE, from, &key, call, self.params.vote)
            .await?;

        self.cache.confirm_vote(poll_index, voter);
        info!(tx_hash = %receipt.tx_hash, option_index, "vote confirmed");
        Ok(receipt.tx_hash)
    }

    /// Submitted -> Confirmed | Reverted | Failed. Returns the receipt only
    /// for a confirmed, successful transaction.
    async fn execute(
        &self,
        operation: &'static str,
        from: Address,
        key: &PrivateKey,
        call: ContractCall,
        gas: GasParams,
    ) -> Result<Receipt, CoordinatorError> {
        let tx_hash = {
            let lease = AccountLease::acquire(&self.account_locks, from);
            let _submitting = lease.lock.lock().await;

            let nonce = self
                .gateway
                .get_nonce(&from)
                .instrument(ledger_call_span("getNonce"))
                .await
                .map_err(|e| self.failed(operation, format!("nonce lookup failed: {e}")))?;
            let request = TransactionRequest {
                from,
                call,
                gas,
                nonce,
                chain_id: self.params.chain_id,
            };
            self.gateway
                .submit_transaction(&request, key)
                .instrument(ledger_call_span(request.call.method()))
                .await
                .map_err(|e| self.failed(operation, e.to_string()))?
        };
        debug!(%tx_hash, "transaction submitted");

        let started = Instant::now();
        let waited = tokio::time::timeout(
            self.confirmation_timeout,
            self.gateway
                .await_confirmation(&tx_hash)
                .instrument(ledger_call_span("awaitConfirmation")),
        )
        .await;
        let receipt = match waited {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => return Err(self.failed(operation, e.to_string())),
            Err(_) => return Err(self.failed(operation, "confirmation timeout".into())),
        };
        self.metrics
            .confirmation_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        if receipt.is_success() {
            self.count(operation, TxOutcome::Confirmed);
            Ok(receipt)
        } else {
            self.count(operation, TxOutcome::Reverted);
            warn!(%tx_hash, block = ?receipt.block_number, "transaction reverted");
            Err(CoordinatorError::TransactionReverted { tx_hash })
        }
    }

    fn count(&self, operation: &str, outcome: TxOutcome) {
        self.metrics
            .transactions
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    fn failed(&self, operation: &str, message: String) -> CoordinatorError {
        self.count(operation, TxOutcome::Failed);
        warn!(operation, error = %message, "transaction failed");
        CoordinatorError::TransactionError(message)
    }

    fn rejected(&self, operation: &str, err: CoordinatorError) -> CoordinatorError {
        let reason = match &err {
            CoordinatorError::AlreadyVoted { .. } => "already_voted",
            _ => "invalid_input",
        };
        self.metrics
            .rejections
            .with_label_values(&[operation, reason])
            .inc();
        err
    }
}

/// A handle on one account's submission lock. Dropping the last handle
/// removes the account from the table.
struct AccountLease<'a> {
    locks: &'a AccountLocks,
    account: Address,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> AccountLease<'a> {
    fn acquire(locks: &'a AccountLocks, account: Address) -> Self {
        let lock = Arc::clone(locks.lock().entry(account).or_default());
        Self {
            locks,
            account,
            lock,
        }
    }
}

impl Drop for AccountLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // Handles are only cloned under the table lock: a count of two is
        // the table plus this lease.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.account);
        }
    }
}

fn validate_create(
    request: &CreatePollRequest,
) -> Result<(String, Vec<String>, Address, PrivateKey), CoordinatorError> {
    Ok((
        validate::title(&request.title)?,
        validate::options(&request.options)?,
        validate::account(&request.account)?,
        validate::private_key(&request.private_key)?,
    ))
}

fn validate_vote(
    request: &CastVoteRequest,
) -> Result<(OptionIndex, VoterId, Address, PrivateKey), CoordinatorError> {
    Ok((
        validate::required(request.option_index, "option_index")?,
        validate::voter(&request.voter)?,
        validate::account(&request.account)?,
        validate::private_key(&request.private_key)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use pollchain_nullables::{NullLedger, Outcome};

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn coordinator() -> (Arc<NullLedger>, Arc<TransactionCoordinator>) {
        let ledger = Arc::new(NullLedger::new());
        ledger.seed_poll("Pet?", &["Cat", "Dog"]);
        let cache = Arc::new(PollCache::new(ledger.clone()));
        let coordinator = TransactionCoordinator::new(
            ledger.clone(),
            cache,
            TransactionParams::default(),
            Duration::from_secs(5),
        );
        (ledger, Arc::new(coordinator))
    }

    fn vote_from(account: String, voter: String) -> CastVoteRequest {
        CastVoteRequest {
            poll_index: Some(0),
            option_index: Some(1),
            voter,
            account,
            private_key: KEY.to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn account_locks_are_released_after_submission() {
        let (ledger, coordinator) = coordinator();
        let votes = (1..=200u64).map(|i| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .cast_vote(vote_from(format!("0x{i:040x}"), format!("v{i}@x.com")))
                    .await
            })
        });
        for joined in join_all(votes).await {
            joined.unwrap().unwrap();
        }

        assert_eq!(ledger.submissions().len(), 200);
        assert!(coordinator.account_locks.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shared_account_lock_is_released_once_the_queue_drains() {
        let (_ledger, coordinator) = coordinator();
        let account = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".to_string();
        let votes = (0..8).map(|i| {
            let coordinator = coordinator.clone();
            let account = account.clone();
            tokio::spawn(async move {
                coordinator
                    .cast_vote(vote_from(account, format!("v{i}@x.com")))
                    .await
            })
        });
        for joined in join_all(votes).await {
            joined.unwrap().unwrap();
        }

        assert!(coordinator.account_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn account_lock_is_released_after_a_failed_submission() {
        let (ledger, coordinator) = coordinator();
        ledger.script(Outcome::SubmitError("connection reset".into()));
        let err = coordinator
            .cast_vote(vote_from(format!("0x{:040x}", 7), "a@x.com".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, CoordinatorError::TransactionError(_)));
        assert!(coordinator.account_locks.lock().is_empty());
    }
}
