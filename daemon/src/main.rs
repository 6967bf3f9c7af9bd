//! pollchain daemon: entry point for running the poll service.

use anyhow::Context;
use clap::Parser;
use pollchain_node::{init_logging, LogFormat, PollService, ServiceConfig, ShutdownController};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pollchain-daemon", about = "Poll creation and voting service")]
struct Cli {
    /// HTTP API port.
    #[arg(long, env = "POLLCHAIN_RPC_PORT")]
    rpc_port: Option<u16>,

    /// JSON-RPC endpoint of the ledger node.
    #[arg(long, env = "POLLCHAIN_RPC_URL")]
    rpc_url: Option<String>,

    /// Address of the deployed poll contract.
    #[arg(long, env = "POLLCHAIN_CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// Chain id used when building transactions.
    #[arg(long, env = "POLLCHAIN_CHAIN_ID")]
    chain_id: Option<u64>,

    /// Key-management endpoint that signs transactions.
    #[arg(long, env = "POLLCHAIN_SIGNER_URL")]
    signer_url: Option<String>,

    /// Seconds to wait for a transaction receipt.
    #[arg(long, env = "POLLCHAIN_CONFIRMATION_TIMEOUT_SECS")]
    confirmation_timeout_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "POLLCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "POLLCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "POLLCHAIN_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(url) = self.rpc_url {
            config.rpc_url = url;
        }
        if let Some(address) = self.contract_address {
            config.contract_address = address;
        }
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
        }
        if let Some(url) = self.signer_url {
            config.signer_url = url;
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            config.confirmation_timeout_secs = secs;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            ServiceConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config file {path}"))?
        }
        None => ServiceConfig::default(),
    };
    let config = cli.apply(file_config);

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);

    tracing::info!(
        rpc_port = config.rpc_port,
        rpc_url = %config.rpc_url,
        chain_id = config.chain_id,
        "starting pollchain daemon"
    );

    let service = PollService::new(config).context("failed to build poll service")?;
    let shutdown = Arc::new(ShutdownController::new());

    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.wait_for_signal().await {
                tracing::error!("failed to install signal handlers: {e}");
                shutdown.shutdown();
            }
        })
    };

    service.run(&shutdown).await?;
    signals.abort();

    tracing::info!("pollchain daemon exited cleanly");
    Ok(())
}
