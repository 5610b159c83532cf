use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use prometheus::Registry;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::poller::Supervisor;
use crate::server;

#[derive(Parser)]
#[command(name = "travisci-exporter")]
#[command(version, about = "Prometheus exporter for TravisCI job durations", long_about = None)]
pub struct Cli {
    /// HTTP listen address for the metrics endpoint
    #[arg(short, long, default_value = "0.0.0.0:9099")]
    address: String,

    /// Path to the YAML file listing accounts to poll
    #[arg(short, long, env = "TRAVISCI_EXPORTER_CONFIG")]
    config: PathBuf,

    /// Seconds between poll cycles for each account
    #[arg(short, long, default_value_t = 60)]
    interval: u64,
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(&self.config)
            .with_context(|| format!("Failed to load config from {}", self.config.display()))?;

        let registry = Arc::new(Registry::new());
        let metrics = Metrics::new(&registry).context("Failed to register metrics")?;

        let interval = Duration::from_secs(self.interval);
        let supervisor = Supervisor::spawn(&config.accounts, interval, metrics)
            .context("Failed to start pollers")?;
        info!(
            "Polling {} accounts every {:?}",
            config.accounts.len(),
            interval
        );

        server::serve(&self.address, registry, shutdown_signal())
            .await
            .with_context(|| format!("Failed to serve metrics on {}", self.address))?;

        info!("Shutting down pollers");
        supervisor.shutdown().await;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
}
