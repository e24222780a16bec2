use anyhow::{Context, Result};
use ledger_sync::{build_scheduler, Config, VERSION};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(version = VERSION, "ledger-sync starting");

    // Missing credentials are fatal; nothing is retried before this succeeds
    let config = Config::from_env().context("Failed to load configuration")?;
    let scheduler = build_scheduler(&config)?;

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("ledger-sync shut down cleanly");
    Ok(())
}
