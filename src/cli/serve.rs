use std::path::Path;

use crate::config::RelayConfig;
use crate::error::Result;
use crate::server;

/// Execute the `serve` command: start the HTTP server.
pub async fn execute(config_path: Option<&Path>, host: Option<&str>, port: Option<u16>) -> Result<()> {
    let mut config = RelayConfig::load(config_path)?;

    // Override config with CLI arguments
    if let Some(host) = host {
        config.host = host.to_string();
    }
    if let Some(port) = port {
        config.port = port;
    }

    println!("Launch relay starting...");
    println!("Listening on http://{}", config.bind_address());
    println!("Press Ctrl+C to stop");

    server::start(config).await
}
