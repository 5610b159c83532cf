mod auth;
mod cli;
mod config;
mod error;
mod metrics;
mod poller;
mod server;
mod travis;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting travisci-exporter {}", env!("CARGO_PKG_VERSION"));
    cli.execute().await?;

    Ok(())
}
