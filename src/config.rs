use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::bridge::NatsConfig;
use crate::dirs;
use crate::error::{RelayError, Result};
use crate::retry::{Backoff, Jitter, RetrySpec};

/// Settings for the relay server and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Host address for the HTTP server (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Durable queue bridge
    #[serde(default)]
    pub queue: QueueConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            queue: QueueConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from `path`, or from the default config file.
    /// Returns default config if no path is given and the default file does
    /// not exist. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = dirs::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: RelayConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Apply `LAUNCH_RELAY_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LAUNCH_RELAY_QUEUE_ENABLED") {
            self.queue.enabled = parse_bool("LAUNCH_RELAY_QUEUE_ENABLED", &value)?;
        }
        if let Some(url) = lookup("LAUNCH_RELAY_NATS_URL") {
            self.queue.nats.url = url;
        }
        if let Some(token) = lookup("LAUNCH_RELAY_NATS_TOKEN") {
            self.queue.nats.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(name) = lookup("LAUNCH_RELAY_QUEUE_NAME") {
            if name.trim().is_empty() {
                return Err(RelayError::Config(
                    "LAUNCH_RELAY_QUEUE_NAME must not be empty".to_string(),
                ));
            }
            self.queue.queue_name = name;
        }
        Ok(())
    }

    /// Returns the server bind address string (e.g., "127.0.0.1:8080").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(RelayError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Durable queue backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueProvider {
    #[default]
    Nats,
    Memory,
}

/// Durable queue bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Route publishes through the durable queue (default: false)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub provider: QueueProvider,

    /// Queue (subject) name
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    /// Durable consumer name used by the listener
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    #[serde(default)]
    pub nats: NatsConfig,

    #[serde(
        default = "RetryConfig::send",
        deserialize_with = "RetryConfig::deserialize_send"
    )]
    pub send_retry: RetryConfig,

    #[serde(
        default = "RetryConfig::receive",
        deserialize_with = "RetryConfig::deserialize_receive"
    )]
    pub receive_retry: RetryConfig,

    #[serde(
        default = "RetryConfig::connect",
        deserialize_with = "RetryConfig::deserialize_connect"
    )]
    pub connect_retry: RetryConfig,
}

fn default_queue_name() -> String {
    "rocket-messages".to_string()
}

fn default_consumer_name() -> String {
    "launch-relay".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: QueueProvider::default(),
            queue_name: default_queue_name(),
            consumer_name: default_consumer_name(),
            nats: NatsConfig::default(),
            send_retry: RetryConfig::send(),
            receive_retry: RetryConfig::receive(),
            connect_retry: RetryConfig::connect(),
        }
    }
}

/// Retry tuning for one call site
///
/// A partial `[queue.<site>_retry]` table only overrides the keys it names;
/// the rest come from that site's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: Jitter,
}

/// Keys present in a retry table
#[derive(Debug, Deserialize)]
struct RetryOverrides {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    jitter: Option<Jitter>,
}

impl RetryOverrides {
    fn apply(self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            base_delay_ms: self.base_delay_ms.unwrap_or(base.base_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            jitter: self.jitter.unwrap_or(base.jitter),
        }
    }
}

impl RetryConfig {
    fn send() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter: Jitter::Equal,
        }
    }

    fn receive() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: Jitter::Equal,
        }
    }

    fn connect() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter: Jitter::Full,
        }
    }

    fn deserialize_send<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Self, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply(Self::send()))
    }

    fn deserialize_receive<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Self, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply(Self::receive()))
    }

    fn deserialize_connect<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Self, D::Error> {
        RetryOverrides::deserialize(d).map(|o| o.apply(Self::connect()))
    }

    /// Retry spec for the call site `name`, retrying transient relay faults
    pub fn spec(&self, name: &'static str) -> RetrySpec<RelayError> {
        RetrySpec::new(
            name,
            self.max_attempts,
            Backoff {
                base: Duration::from_millis(self.base_delay_ms),
                max: Duration::from_millis(self.max_delay_ms),
                jitter: self.jitter,
            },
            RelayError::is_transient,
        )
    }
}
