//! # launch-relay
//!
//! Real-time distribution of rocket launch events to connected viewers.
//!
//! ## Overview
//!
//! Launch events published over HTTP (or drained from a durable queue) are
//! fanned out by an in-process [`EventBroker`] to every open server-sent
//! event stream. The most recent event is kept for late joiners. An optional
//! queue bridge routes publishes through NATS JetStream so producers and
//! viewers survive restarts of either side.
//!
//! ## Quick Start
//!
//! ```rust
//! use launch_relay::{EventBroker, LaunchEvent};
//!
//! # async fn example() {
//! let broker = EventBroker::new();
//! let mut viewer = broker.subscribe();
//!
//! broker.publish(LaunchEvent::now("Earth", "Mars", "abc123"));
//!
//! let event = viewer.recv().await.unwrap();
//! assert_eq!(event.rocket_id, "abc123");
//! assert_eq!(broker.latest().unwrap(), event);
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **EventBroker** - subscriber registry, fan-out, and latest event
//! - **StreamSession** - one SSE connection over a broker subscription
//! - **QueueBridge** - publisher and listener over a pluggable `QueueTransport`
//! - **retry** - exponential backoff for infrastructure calls

pub mod api;
pub mod bridge;
pub mod broker;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod retry;
pub mod server;
pub mod session;
pub mod types;

// Re-export core types
pub use bridge::{
    Delivery, EventPublisher, MemoryQueue, NatsConfig, NatsTransport, QueueBridge,
    QueueListener, QueueMessage, QueueReceiver, QueueTransport,
};
pub use broker::{EventBroker, Subscription, SubscriptionId};
pub use config::{QueueConfig, QueueProvider, RelayConfig, RetryConfig};
pub use error::{RelayError, Result};
pub use session::{SseFrame, StreamSession};
pub use types::{LaunchEvent, PublishRequest};
