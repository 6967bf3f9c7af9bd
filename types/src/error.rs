//! Error type for parsing and validating shared types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("address checksum mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("invalid private key format")]
    InvalidPrivateKey,

    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("malformed poll set: {titles} titles but {options} option lists")]
    MalformedPollSet { titles: usize, options: usize },

    #[error("malformed results: {options} options but {counts} counts")]
    MalformedResults { options: usize, counts: usize },
}
