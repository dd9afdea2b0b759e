//! Bridge between the in-process broker and a durable queue
//!
//! The publisher side turns local publishes into queue messages (with
//! retry); the listener side drains the queue into the broker. Both talk to
//! the queue only through [`QueueTransport`], so backends (NATS JetStream,
//! in-memory) are swapped at startup without touching the rest of the
//! service.

pub mod listener;
pub mod memory;
pub mod nats;
pub mod publisher;

pub use listener::QueueListener;
pub use memory::MemoryQueue;
pub use nats::{NatsConfig, NatsTransport, StorageType};
pub use publisher::{EventPublisher, LocalPublisher, QueuePublisher};

use crate::broker::EventBroker;
use crate::config::{QueueConfig, QueueProvider};
use crate::error::Result;
use crate::retry;
use crate::types::LaunchEvent;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// Attribute keys mirrored from the event body
pub const ATTR_ROCKET_ID: &str = "rocketId";
pub const ATTR_SOURCE: &str = "source";
pub const ATTR_DESTINATION: &str = "destination";

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Message as sent to the durable queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    /// Unique id, stable across retries of the same send
    pub message_id: String,

    /// Short subject line (the rocket id), sent as the `Subject` header
    pub subject: String,

    pub content_type: String,

    /// Event JSON
    pub body: Bytes,

    /// Key/value copies of event fields for filtering without decoding
    pub attributes: HashMap<String, String>,
}

impl QueueMessage {
    /// Build the queue message for an event
    pub fn from_event(event: &LaunchEvent) -> Result<Self> {
        let body = serde_json::to_vec(event)?;

        let message_id = if event.rocket_id.trim().is_empty() {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            format!("{}:{}", event.rocket_id, uuid::Uuid::new_v4().simple())
        };

        let attributes = HashMap::from([
            (ATTR_ROCKET_ID.to_string(), event.rocket_id.clone()),
            (ATTR_SOURCE.to_string(), event.source.clone()),
            (ATTR_DESTINATION.to_string(), event.destination.clone()),
        ]);

        Ok(Self {
            message_id,
            subject: event.rocket_id.clone(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: Bytes::from(body),
            attributes,
        })
    }

    /// Decode the body back into an event
    pub fn decode(&self) -> Result<LaunchEvent> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

type SettleFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A received message pending acknowledgement
pub struct Delivery {
    /// Raw message body
    pub payload: Bytes,

    /// Message attributes (headers)
    pub attributes: HashMap<String, String>,

    /// Number of delivery attempts, including this one
    pub num_delivered: u64,

    ack_fn: SettleFn,
    discard_fn: SettleFn,
}

impl Delivery {
    /// Create a delivery with ack/discard callbacks
    pub fn new(
        payload: Bytes,
        attributes: HashMap<String, String>,
        num_delivered: u64,
        ack_fn: impl FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static,
        discard_fn: impl FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static,
    ) -> Self {
        Self {
            payload,
            attributes,
            num_delivered,
            ack_fn: Box::new(ack_fn),
            discard_fn: Box::new(discard_fn),
        }
    }

    /// Decode the payload into an event
    pub fn decode(&self) -> Result<LaunchEvent> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Confirm successful processing
    pub async fn ack(self) -> Result<()> {
        (self.ack_fn)().await
    }

    /// Drop a message that can never be processed; it is not redelivered
    pub async fn discard(self) -> Result<()> {
        (self.discard_fn)().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .field("attributes", &self.attributes)
            .field("num_delivered", &self.num_delivered)
            .finish()
    }
}

/// Durable queue backend
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Enqueue one message
    async fn send(&self, message: &QueueMessage) -> Result<()>;

    /// Open a receiver for the queue
    async fn receiver(&self) -> Result<Box<dyn QueueReceiver>>;

    /// Flush and release the connection
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Backend name (e.g. "nats", "memory")
    fn name(&self) -> &str;
}

/// Stream of deliveries from a queue
#[async_trait]
pub trait QueueReceiver: Send {
    /// Wait for the next delivery; `Ok(None)` once the underlying stream ended
    async fn next(&mut self) -> Result<Option<Delivery>>;
}

/// Bridge mode, chosen once at startup
pub enum QueueBridge {
    /// No durable queue: publishes go straight to the broker
    Disabled,
    /// Publishes go to the queue; the listener feeds the broker
    Enabled {
        transport: Arc<dyn QueueTransport>,
        config: QueueConfig,
    },
}

impl QueueBridge {
    /// Resolve the bridge from configuration, connecting if needed
    pub async fn from_config(config: &QueueConfig) -> Result<Self> {
        if !config.enabled {
            tracing::info!("Queue bridge disabled, publishing in-memory only");
            return Ok(QueueBridge::Disabled);
        }

        let transport: Arc<dyn QueueTransport> = match config.provider {
            QueueProvider::Memory => Arc::new(MemoryQueue::new()),
            QueueProvider::Nats => {
                if config.nats.url.trim().is_empty() {
                    tracing::warn!("Queue bridge enabled but no NATS url configured, staying in-memory");
                    return Ok(QueueBridge::Disabled);
                }
                let connect = config.connect_retry.spec("queue-connect");
                let nats = retry::execute(&connect, || {
                    NatsTransport::connect(
                        config.nats.clone(),
                        config.queue_name.clone(),
                        config.consumer_name.clone(),
                    )
                })
                .await?;
                Arc::new(nats)
            }
        };

        tracing::info!(
            provider = transport.name(),
            queue = %config.queue_name,
            "Queue bridge enabled"
        );
        Ok(Self::with_transport(transport, config.clone()))
    }

    /// Enable the bridge over an existing transport
    pub fn with_transport(transport: Arc<dyn QueueTransport>, config: QueueConfig) -> Self {
        QueueBridge::Enabled { transport, config }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, QueueBridge::Enabled { .. })
    }

    /// Transport name, if any
    pub fn provider(&self) -> Option<&str> {
        match self {
            QueueBridge::Disabled => None,
            QueueBridge::Enabled { transport, .. } => Some(transport.name()),
        }
    }

    /// Flush and release the transport
    pub async fn close(&self) -> Result<()> {
        match self {
            QueueBridge::Disabled => Ok(()),
            QueueBridge::Enabled { transport, .. } => transport.close().await,
        }
    }

    /// Publisher for local publish requests
    pub fn publisher(&self, broker: Arc<EventBroker>) -> Arc<dyn EventPublisher> {
        match self {
            QueueBridge::Disabled => Arc::new(LocalPublisher::new(broker)),
            QueueBridge::Enabled { transport, config } => Arc::new(QueuePublisher::new(
                transport.clone(),
                config.send_retry.spec("queue-send"),
            )),
        }
    }

    /// Listener feeding the broker, when the bridge is enabled
    pub fn listener(&self, broker: Arc<EventBroker>) -> Option<QueueListener> {
        match self {
            QueueBridge::Disabled => None,
            QueueBridge::Enabled { transport, config } => Some(QueueListener::new(
                transport.clone(),
                broker,
                config.receive_retry.spec("queue-receive"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_message_from_event() {
        let event = LaunchEvent::now("Earth", "Mars", "abc123");
        let msg = QueueMessage::from_event(&event).unwrap();

        assert!(msg.message_id.starts_with("abc123:"));
        assert_eq!(msg.subject, "abc123");
        assert_eq!(msg.content_type, "application/json");
        assert_eq!(msg.attributes[ATTR_ROCKET_ID], "abc123");
        assert_eq!(msg.attributes[ATTR_SOURCE], "Earth");
        assert_eq!(msg.attributes[ATTR_DESTINATION], "Mars");
        assert_eq!(msg.decode().unwrap(), event);
    }

    #[test]
    fn test_queue_message_blank_rocket_id() {
        let event = LaunchEvent::now("Earth", "Mars", "  ");
        let msg = QueueMessage::from_event(&event).unwrap();
        assert!(!msg.message_id.contains(':'));
        assert_eq!(msg.message_id.len(), 32);
    }

    #[test]
    fn test_message_ids_are_unique() {
        let event = LaunchEvent::now("Earth", "Mars", "dup");
        let a = QueueMessage::from_event(&event).unwrap();
        let b = QueueMessage::from_event(&event).unwrap();
        assert_ne!(a.message_id, b.message_id);
    }

    #[tokio::test]
    async fn test_delivery_settles() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tx2 = tx.clone();
        let delivery = Delivery::new(
            Bytes::from_static(b"{}"),
            HashMap::new(),
            1,
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    tx.send("ack").unwrap();
                    Ok(())
                })
            },
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    tx2.send("discard").unwrap();
                    Ok(())
                })
            },
        );
        assert!(delivery.decode().is_err());
        delivery.ack().await.unwrap();
        assert_eq!(rx.recv().await, Some("ack"));
    }

    #[tokio::test]
    async fn test_disabled_bridge() {
        let config = QueueConfig::default();
        let bridge = QueueBridge::from_config(&config).await.unwrap();
        assert!(!bridge.is_enabled());

        let broker = Arc::new(EventBroker::new());
        assert!(bridge.listener(broker.clone()).is_none());
        assert_eq!(bridge.publisher(broker).name(), "local");
    }

    #[tokio::test]
    async fn test_enabled_nats_without_url_falls_back() {
        let mut config = QueueConfig::default();
        config.enabled = true;
        config.provider = QueueProvider::Nats;
        config.nats.url = String::new();

        let bridge = QueueBridge::from_config(&config).await.unwrap();
        assert!(!bridge.is_enabled());
    }

    #[tokio::test]
    async fn test_memory_bridge() {
        let mut config = QueueConfig::default();
        config.enabled = true;
        config.provider = QueueProvider::Memory;

        let bridge = QueueBridge::from_config(&config).await.unwrap();
        assert!(bridge.is_enabled());

        let broker = Arc::new(EventBroker::new());
        assert!(bridge.listener(broker.clone()).is_some());
        assert_eq!(bridge.publisher(broker).name(), "queue");
    }
}
