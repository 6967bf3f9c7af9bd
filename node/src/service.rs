//! Wires the ledger client, cache, coordinator and HTTP server together.

use pollchain_cache::PollCache;
use pollchain_coordinator::TransactionCoordinator;
use pollchain_gateway::{JsonRpcGateway, LedgerGateway, RemoteSigner};
use pollchain_rpc::{AppState, RpcServer};
use std::sync::Arc;
use tracing::info;

use crate::{ServiceConfig, ServiceError, ShutdownController};

pub struct PollService {
    config: ServiceConfig,
    state: AppState,
}

impl PollService {
    /// Build the service against the configured ledger node and signer.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let contract = config.contract()?;
        let signer = Arc::new(RemoteSigner::new(
            config.signer_url.clone(),
            config.request_timeout(),
        )?);
        let gateway = JsonRpcGateway::new(
            config.rpc_url.clone(),
            contract,
            signer,
            config.request_timeout(),
            config.receipt_poll_interval(),
        )?;
        info!(rpc_url = %config.rpc_url, %contract, chain_id = config.chain_id, "ledger client ready");
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Build the service over any gateway. One cache instance is shared by
    /// the coordinator and the read endpoints.
    pub fn with_gateway(config: ServiceConfig, gateway: Arc<dyn LedgerGateway>) -> Self {
        let cache = Arc::new(PollCache::new(Arc::clone(&gateway)));
        let coordinator = Arc::new(TransactionCoordinator::new(
            gateway,
            cache,
            config.transaction_params(),
            config.confirmation_timeout(),
        ));
        Self {
            config,
            state: AppState::new(coordinator),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve the HTTP API until `shutdown` fires.
    pub async fn run(&self, shutdown: &ShutdownController) -> Result<(), ServiceError> {
        info!(port = self.config.rpc_port, "starting poll service");
        RpcServer::new(self.config.rpc_port, self.state.clone())
            .start(shutdown.signalled())
            .await?;
        Ok(())
    }
}
