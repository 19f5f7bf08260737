//! Process entry point: parses flags, loads configuration, installs the
//! tracing subscriber and runs the orchestrator to completion (§6).

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sparrow::config::{Cli, SparrowConfig};
use sparrow::orchestrator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let cli = Cli::parse();
    let config = match SparrowConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    match orchestrator::run(config).await {
        Ok(()) => {
            tracing::info!("sparrow shut down cleanly");
            std::process::exit(0);
        }
        Err(errors) => {
            tracing::error!(error = %errors, "sparrow shut down with errors");
            std::process::exit(1);
        }
    }
}
