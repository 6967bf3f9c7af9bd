//! The ledger seam: everything the coordinator and cache need from the chain.

use async_trait::async_trait;
use pollchain_types::{Address, GasParams, PrivateKey, TxHash};

use crate::{ContractCall, LedgerError, ReadCall, ReadOutput};

/// A contract call plus the fixed parameters needed to turn it into a
/// transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub call: ContractCall,
    pub gas: GasParams,
    pub nonce: u64,
    pub chain_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Access to the poll contract on the ledger.
///
/// Every method is a long-latency remote call. Implementations must not
/// impose their own bound on [`await_confirmation`](Self::await_confirmation);
/// callers wrap it in a timeout.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Next nonce for `account`, counting transactions still pending.
    async fn get_nonce(&self, account: &Address) -> Result<u64, LedgerError>;

    /// Execute a read-only contract call against the latest state.
    async fn call_read_only(&self, call: &ReadCall) -> Result<ReadOutput, LedgerError>;

    /// Sign `request` with `key` and broadcast it.
    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        key: &PrivateKey,
    ) -> Result<TxHash, LedgerError>;

    /// Wait until `tx_hash` is mined and return its receipt.
    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError>;
}
