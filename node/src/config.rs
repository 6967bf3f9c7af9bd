//! Service configuration with TOML file support.

use pollchain_types::{Address, GasParams, TransactionParams, SEPOLIA_CHAIN_ID};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ServiceError;

/// Configuration for the poll service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP API port.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// JSON-RPC endpoint of the ledger node.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Address of the deployed poll contract. Required.
    #[serde(default)]
    pub contract_address: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Key-management endpoint that signs transactions.
    #[serde(default = "default_signer_url")]
    pub signer_url: String,

    #[serde(default = "default_create_poll_gas_limit")]
    pub create_poll_gas_limit: u64,

    #[serde(default = "default_create_poll_gas_price_gwei")]
    pub create_poll_gas_price_gwei: u64,

    #[serde(default = "default_vote_gas_limit")]
    pub vote_gas_limit: u64,

    #[serde(default = "default_vote_gas_price_gwei")]
    pub vote_gas_price_gwei: u64,

    /// Upper bound on waiting for a receipt.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    /// Per-request timeout for ledger and signer HTTP calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter (e.g. "info", "debug,pollchain_cache=trace").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Defaults ───────────────────────────────────────────────────────────

fn default_rpc_port() -> u16 {
    7077
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_chain_id() -> u64 {
    SEPOLIA_CHAIN_ID
}

fn default_signer_url() -> String {
    "http://127.0.0.1:8550/sign".to_string()
}

fn default_create_poll_gas_limit() -> u64 {
    2_000_000
}

fn default_create_poll_gas_price_gwei() -> u64 {
    25
}

fn default_vote_gas_limit() -> u64 {
    200_000
}

fn default_vote_gas_price_gwei() -> u64 {
    20
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_receipt_poll_interval_ms() -> u64 {
    1_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    pub fn contract(&self) -> Result<Address, ServiceError> {
        if self.contract_address.trim().is_empty() {
            return Err(ServiceError::Config("contract_address is not set".into()));
        }
        self.contract_address
            .trim()
            .parse()
            .map_err(|e| ServiceError::Config(format!("contract_address: {e}")))
    }

    pub fn transaction_params(&self) -> TransactionParams {
        TransactionParams {
            chain_id: self.chain_id,
            create_poll: GasParams::from_gwei(
                self.create_poll_gas_limit,
                self.create_poll_gas_price_gwei,
            ),
            vote: GasParams::from_gwei(self.vote_gas_limit, self.vote_gas_price_gwei),
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rpc_port: default_rpc_port(),
            rpc_url: default_rpc_url(),
            contract_address: String::new(),
            chain_id: default_chain_id(),
            signer_url: default_signer_url(),
            create_poll_gas_limit: default_create_poll_gas_limit(),
            create_poll_gas_price_gwei: default_create_poll_gas_price_gwei(),
            vote_gas_limit: default_vote_gas_limit(),
            vote_gas_price_gwei: default_vote_gas_price_gwei(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
