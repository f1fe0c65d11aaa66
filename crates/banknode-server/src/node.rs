use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use banknode_ledger::LedgerStore;
use banknode_protocol::Executor;

use crate::config::NodeConfig;
use crate::listener::Listener;
use crate::session::{SessionConfig, SessionHandler};

/// Open the ledger, serve clients until `shutdown` resolves, then close the ledger.
///
/// A ledger file that cannot be read is fatal.
pub async fn run(config: NodeConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
    let bank_code = config.resolve_bank_code();
    info!(%bank_code, port = config.port, data_file = %config.data_file.display(), "Starting bank node");

    let ledger = Arc::new(
        LedgerStore::open(&config.data_file)
            .await
            .with_context(|| format!("Failed to open ledger {}", config.data_file.display()))?,
    );
    let executor = Executor::new(bank_code, ledger.clone());
    let handler = SessionHandler::new(
        executor,
        SessionConfig {
            idle_timeout: config.idle_timeout(),
            max_malformed_lines: config.max_malformed_lines,
        },
    );

    let listener = Listener::bind(config.bind_addr(), handler).await?;
    listener.run_until(shutdown).await?;

    ledger.close().await.context("Failed to flush ledger")?;
    Ok(())
}
