//! Request field checks run before any ledger interaction.

use pollchain_types::{Address, PrivateKey, VoterId};

use crate::CoordinatorError;

pub fn account(raw: &str) -> Result<Address, CoordinatorError> {
    raw.trim()
        .parse()
        .map_err(|_| CoordinatorError::InvalidInput("invalid wallet address".into()))
}

/// The parse error is dropped so no part of the key reaches a message or log.
pub fn private_key(raw: &str) -> Result<PrivateKey, CoordinatorError> {
    raw.parse()
        .map_err(|_| CoordinatorError::InvalidInput("invalid private key".into()))
}

/// Title and options go to the ledger exactly as given.
pub fn title(raw: &str) -> Result<String, CoordinatorError> {
    if raw.trim().is_empty() {
        return Err(CoordinatorError::InvalidInput(
            "poll title cannot be empty".into(),
        ));
    }
    Ok(raw.to_string())
}

pub fn options(raw: &[String]) -> Result<Vec<String>, CoordinatorError> {
    if raw.is_empty() {
        return Err(CoordinatorError::InvalidInput(
            "poll options cannot be empty".into(),
        ));
    }
    raw.iter()
        .map(|option| {
            if option.trim().is_empty() {
                Err(CoordinatorError::InvalidInput(
                    "poll options cannot be blank".into(),
                ))
            } else {
                Ok(option.clone())
            }
        })
        .collect()
}

pub fn voter(raw: &str) -> Result<VoterId, CoordinatorError> {
    let voter = VoterId::new(raw.trim());
    if voter.is_empty() {
        return Err(CoordinatorError::InvalidInput("voter id cannot be empty".into()));
    }
    Ok(voter)
}

pub fn required<T>(value: Option<T>, field: &str) -> Result<T, CoordinatorError> {
    value.ok_or_else(|| CoordinatorError::InvalidInput(format!("missing {field}")))
}
