//! Ledger gateway for the poll contract.
//!
//! - [`LedgerGateway`] is the seam the rest of the workspace depends on:
//!   nonce lookup, read-only calls, transaction submission and confirmation.
//! - [`abi`] encodes contract calls and decodes their return data.
//! - [`JsonRpcGateway`] talks to an EVM JSON-RPC endpoint over HTTP.
//! - [`TransactionSigner`] hands unsigned transactions to key management.

pub mod abi;
pub mod calls;
pub mod error;
pub mod gateway;
pub mod jsonrpc;
pub mod signer;

pub use calls::{ContractCall, ReadCall, ReadOutput};
pub use error::LedgerError;
pub use gateway::{LedgerGateway, Receipt, ReceiptStatus, TransactionRequest};
pub use jsonrpc::JsonRpcGateway;
pub use signer::{RemoteSigner, SignedTransaction, TransactionSigner, UnsignedTransaction};
