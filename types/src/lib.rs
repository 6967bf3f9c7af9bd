//! Fundamental types for pollchain.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, private keys, transaction hashes, poll data and the fixed
//! transaction parameters.

pub mod address;
pub mod error;
pub mod hash;
pub mod keys;
pub mod params;
pub mod poll;

pub use address::Address;
pub use error::TypesError;
pub use hash::{keccak256, TxHash};
pub use keys::PrivateKey;
pub use params::{GasParams, TransactionParams, SEPOLIA_CHAIN_ID};
pub use poll::{OptionIndex, PollIndex, PollSet, ResultsEntry, VoterId};
