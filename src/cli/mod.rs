pub mod send;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Launch Relay - Real-time rocket launch event relay
#[derive(Debug, Parser)]
#[command(name = "launch-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Config file (default: ~/.launch-relay/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host address to bind to, overriding the config file
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on, overriding the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Enqueue simulated rocket launches on the durable queue
    Send {
        /// Config file (default: ~/.launch-relay/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of launches to send (default: until Ctrl+C)
        #[arg(long)]
        count: Option<u64>,

        /// Delay between launches in milliseconds
        #[arg(long, default_value_t = 4000)]
        interval_ms: u64,

        /// Launch site name
        #[arg(long, default_value = "Earth")]
        source: String,
    },
}
