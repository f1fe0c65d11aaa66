use anyhow::Result;
use clap::Parser;

use banknode_server::{Cli, node, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config()?;
    telemetry::init(config.log_file.as_deref())?;
    config.validate()?;

    node::run(config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    })
    .await
}
