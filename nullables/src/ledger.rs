//! Nullable ledger: an in-memory poll contract with scriptable outcomes.

use async_trait::async_trait;
use pollchain_gateway::{
    ContractCall, LedgerError, LedgerGateway, ReadCall, ReadOutput, Receipt, ReceiptStatus,
    TransactionRequest,
};
use pollchain_types::{Address, PrivateKey, TxHash};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// What the next submitted transaction should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Mine it and apply the call to contract state (the default).
    Confirm,
    /// Mine it with a failed status; contract state is untouched.
    Revert,
    /// Fail `submit_transaction` with a transport error.
    SubmitError(String),
    /// Accept the submission but fail `await_confirmation`.
    ConfirmError(String),
    /// Accept the submission and never produce a receipt.
    NeverConfirm,
}

#[derive(Default)]
struct Contract {
    titles: Vec<String>,
    options: Vec<Vec<String>>,
    votes: Vec<Vec<u64>>,
}

impl Contract {
    /// Apply a mined call. Returns `false` when the contract would revert.
    fn apply(&mut self, call: &ContractCall) -> bool {
        match call {
            ContractCall::CreatePoll { title, options } => {
                self.titles.push(title.clone());
                self.options.push(options.clone());
                self.votes.push(vec![0; options.len()]);
                true
            }
            ContractCall::Vote {
                poll_index,
                option_index,
            } => {
                let count = usize::try_from(*poll_index)
                    .ok()
                    .and_then(|p| self.votes.get_mut(p))
                    .and_then(|counts| {
                        usize::try_from(*option_index)
                            .ok()
                            .and_then(|o| counts.get_mut(o))
                    });
                match count {
                    Some(count) => {
                        *count += 1;
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

struct Pending {
    call: ContractCall,
    outcome: Outcome,
}

#[derive(Default)]
struct State {
    contract: Contract,
    nonces: HashMap<Address, u64>,
    pending: HashMap<TxHash, Pending>,
    script: VecDeque<Outcome>,
    next_tx: u64,
    fail_reads: Option<String>,
    fail_nonce: Option<String>,
    nonce_calls: u64,
    poll_reads: u64,
    result_reads: u64,
    submissions: Vec<TransactionRequest>,
}

/// A test ledger that keeps poll contract state in memory.
///
/// Thread-safe for use with tokio's multi-threaded runtime. Reads can be
/// slowed down with [`with_read_delay`](Self::with_read_delay) so concurrent
/// callers overlap.
pub struct NullLedger {
    state: Mutex<State>,
    read_delay: Option<Duration>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            read_delay: None,
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Seed a poll directly, as if created by an earlier confirmed transaction.
    pub fn seed_poll(&self, title: &str, options: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.contract.apply(&ContractCall::CreatePoll {
            title: title.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        });
    }

    /// Overwrite the tally of a seeded poll.
    pub fn set_votes(&self, poll_index: usize, counts: Vec<u64>) {
        self.state.lock().unwrap().contract.votes[poll_index] = counts;
    }

    /// Queue the outcome of the next submitted transaction.
    pub fn script(&self, outcome: Outcome) {
        self.state.lock().unwrap().script.push_back(outcome);
    }

    /// Make every read-only call fail with `message` (`None` restores reads).
    pub fn fail_reads(&self, message: Option<&str>) {
        self.state.lock().unwrap().fail_reads = message.map(String::from);
    }

    /// Make every nonce lookup fail with `message` (`None` restores lookups).
    pub fn fail_nonce(&self, message: Option<&str>) {
        self.state.lock().unwrap().fail_nonce = message.map(String::from);
    }

    pub fn poll_reads(&self) -> u64 {
        self.state.lock().unwrap().poll_reads
    }

    pub fn result_reads(&self) -> u64 {
        self.state.lock().unwrap().result_reads
    }

    pub fn nonce_calls(&self) -> u64 {
        self.state.lock().unwrap().nonce_calls
    }

    /// Every transaction request accepted so far.
    pub fn submissions(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Total number of calls of any kind made against this ledger.
    pub fn total_calls(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.nonce_calls + state.poll_reads + state.result_reads + state.submissions.len() as u64
    }

    pub fn votes(&self, poll_index: usize) -> Vec<u64> {
        self.state.lock().unwrap().contract.votes[poll_index].clone()
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().unwrap().contract.titles.len()
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for NullLedger {
    async fn get_nonce(&self, account: &Address) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.nonce_calls += 1;
        if let Some(message) = &state.fail_nonce {
            return Err(LedgerError::Transport(message.clone()));
        }
        Ok(state.nonces.get(account).copied().unwrap_or(0))
    }

    async fn call_read_only(&self, call: &ReadCall) -> Result<ReadOutput, LedgerError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        match call {
            ReadCall::GetAllPolls => state.poll_reads += 1,
            ReadCall::GetResults { .. } => state.result_reads += 1,
        }
        if let Some(message) = &state.fail_reads {
            return Err(LedgerError::Transport(message.clone()));
        }
        match call {
            ReadCall::GetAllPolls => Ok(ReadOutput::Polls {
                titles: state.contract.titles.clone(),
                options: state.contract.options.clone(),
            }),
            ReadCall::GetResults { poll_index } => usize::try_from(*poll_index)
                .ok()
                .and_then(|p| state.contract.votes.get(p))
                .map(|counts| ReadOutput::Results(counts.clone()))
                .ok_or_else(|| LedgerError::Rpc {
                    code: 3,
                    message: "execution reverted: poll does not exist".into(),
                }),
        }
    }

    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        _key: &PrivateKey,
    ) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let expected = state.nonces.get(&request.from).copied().unwrap_or(0);
        if request.nonce != expected {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("nonce too low: expected {expected}, got {}", request.nonce),
            });
        }
        let outcome = state.script.pop_front().unwrap_or(Outcome::Confirm);
        if let Outcome::SubmitError(message) = outcome {
            return Err(LedgerError::Transport(message));
        }
        state.nonces.insert(request.from, expected + 1);
        state.submissions.push(request.clone());
        state.next_tx += 1;
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&state.next_tx.to_be_bytes());
        let hash = TxHash::new(bytes);
        state.pending.insert(
            hash,
            Pending {
                call: request.call.clone(),
                outcome,
            },
        );
        Ok(hash)
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        let pending = self.state.lock().unwrap().pending.remove(tx_hash);
        let Some(pending) = pending else {
            return Err(LedgerError::UnexpectedResponse(format!(
                "unknown transaction {tx_hash}"
            )));
        };
        let status = match pending.outcome {
            Outcome::NeverConfirm => std::future::pending().await,
            Outcome::ConfirmError(message) => return Err(LedgerError::Transport(message)),
            Outcome::Revert => ReceiptStatus::Reverted,
            Outcome::Confirm | Outcome::SubmitError(_) => {
                let applied = self.state.lock().unwrap().contract.apply(&pending.call);
                if applied {
                    ReceiptStatus::Success
                } else {
                    ReceiptStatus::Reverted
                }
            }
        };
        Ok(Receipt {
            tx_hash: *tx_hash,
            status,
            block_number: Some(1),
            gas_used: Some(21_000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollchain_types::GasParams;

    fn vote(poll_index: u64, option_index: u64) -> TransactionRequest {
        TransactionRequest {
            from: Address::new([7; 20]),
            call: ContractCall::Vote {
                poll_index,
                option_index,
            },
            gas: GasParams::from_gwei(200_000, 20),
            nonce: 0,
            chain_id: 1,
        }
    }

    #[tokio::test]
    async fn confirmed_vote_updates_tally() {
        let ledger = NullLedger::new();
        ledger.seed_poll("Pet?", &["Cat", "Dog"]);
        let key = PrivateKey::new([1; 32]);

        let hash = ledger.submit_transaction(&vote(0, 1), &key).await.unwrap();
        let receipt = ledger.await_confirmation(&hash).await.unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.votes(0), vec![0, 1]);
    }

    #[tokio::test]
    async fn out_of_range_vote_reverts() {
        let ledger = NullLedger::new();
        ledger.seed_poll("Pet?", &["Cat"]);
        let key = PrivateKey::new([1; 32]);

        let hash = ledger.submit_transaction(&vote(0, 5), &key).await.unwrap();
        let receipt = ledger.await_confirmation(&hash).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert_eq!(ledger.votes(0), vec![0]);
    }

    #[tokio::test]
    async fn scripted_revert_leaves_contract_untouched() {
        let ledger = NullLedger::new();
        ledger.seed_poll("Pet?", &["Cat"]);
        ledger.script(Outcome::Revert);
        let key = PrivateKey::new([1; 32]);

        let hash = ledger.submit_transaction(&vote(0, 0), &key).await.unwrap();
        let receipt = ledger.await_confirmation(&hash).await.unwrap();
        assert!(!receipt.is_success());
        assert_eq!(ledger.votes(0), vec![0]);
    }

    #[tokio::test]
    async fn reused_nonce_is_rejected() {
        let ledger = NullLedger::new();
        ledger.seed_poll("Pet?", &["Cat"]);
        let key = PrivateKey::new([1; 32]);

        ledger.submit_transaction(&vote(0, 0), &key).await.unwrap();
        let err = ledger.submit_transaction(&vote(0, 0), &key).await.unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { .. }));
        assert_eq!(ledger.nonce_calls(), 0);
        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn failing_nonce_lookup_is_counted() {
        let ledger = NullLedger::new();
        let account = Address::new([7; 20]);
        ledger.fail_nonce(Some("node syncing"));
        assert!(ledger.get_nonce(&account).await.is_err());
        ledger.fail_nonce(None);
        assert_eq!(ledger.get_nonce(&account).await.unwrap(), 0);
        assert_eq!(ledger.nonce_calls(), 2);
    }

    #[tokio::test]
    async fn failing_reads_are_counted() {
        let ledger = NullLedger::new();
        ledger.fail_reads(Some("boom"));
        assert!(ledger.call_read_only(&ReadCall::GetAllPolls).await.is_err());
        assert_eq!(ledger.poll_reads(), 1);
    }
}
