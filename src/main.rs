use clap::Parser;
use tracing_subscriber::EnvFilter;

use launch_relay::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            launch_relay::cli::serve::execute(config.as_deref(), host.as_deref(), port).await?;
        }
        Commands::Send {
            config,
            count,
            interval_ms,
            source,
        } => {
            launch_relay::cli::send::execute(config.as_deref(), count, interval_ms, &source)
                .await?;
        }
    }

    Ok(())
}
