//! NATS JetStream connection settings

use serde::{Deserialize, Serialize};

/// JetStream storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    File,
    Memory,
}

/// Connection and stream settings for the NATS transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatsConfig {
    /// Server URL; empty disables the bridge
    #[serde(default = "default_url")]
    pub url: String,

    /// Auth token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// JetStream stream holding the queue subject
    #[serde(default = "default_stream_name")]
    pub stream_name: String,

    #[serde(default)]
    pub storage: StorageType,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Redelivery delay for unacknowledged messages
    #[serde(default = "default_ack_wait")]
    pub ack_wait_secs: u64,
}

fn default_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_stream_name() -> String {
    "ROCKET_MESSAGES".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_ack_wait() -> u64 {
    30
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            stream_name: default_stream_name(),
            storage: StorageType::default(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            ack_wait_secs: default_ack_wait(),
        }
    }
}
