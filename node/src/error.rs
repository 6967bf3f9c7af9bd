use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("ledger client error: {0}")]
    Ledger(#[from] pollchain_gateway::LedgerError),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] pollchain_rpc::RpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
