//! NATS JetStream queue transport
//!
//! Publishes queue messages to a work-queue stream and drains them through a
//! durable pull consumer with explicit acks, giving at-least-once delivery
//! across restarts of either side.

mod client;
mod config;

pub use config::{NatsConfig, StorageType};

use super::{
    Delivery, QueueMessage, QueueReceiver, QueueTransport, ATTR_DESTINATION, ATTR_ROCKET_ID,
    ATTR_SOURCE,
};
use crate::error::{RelayError, Result};
use async_nats::jetstream;
use async_nats::jetstream::AckKind;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::StreamExt;
use std::collections::HashMap;

/// Header carrying the message id for JetStream dedup
const MSG_ID_HEADER: &str = "Nats-Msg-Id";

const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Header carrying the routing subject (the rocket id)
const SUBJECT_HEADER: &str = "Subject";

/// NATS JetStream implementation of [`QueueTransport`]
pub struct NatsTransport {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    stream: jetstream::stream::Stream,
    config: NatsConfig,
    subject: String,
    consumer_name: String,
}

impl NatsTransport {
    /// Connect and make sure the stream for `subject` exists
    pub async fn connect(config: NatsConfig, subject: String, consumer_name: String) -> Result<Self> {
        let client = client::build_connect_options(&config)
            .connect(&config.url)
            .await
            .map_err(|e| RelayError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, "Connected to NATS");

        let jetstream = jetstream::new(client.clone());
        let stream = client::ensure_stream(&jetstream, &config, &subject).await?;

        Ok(Self {
            client,
            jetstream,
            stream,
            config,
            subject,
            consumer_name,
        })
    }
}

#[async_trait]
impl QueueTransport for NatsTransport {
    async fn send(&self, message: &QueueMessage) -> Result<()> {
        let headers = message_headers(message);
        let ack = self
            .jetstream
            .publish_with_headers(self.subject.clone(), headers, message.body.clone())
            .await
            .map_err(|e| client::classify_publish_error(&self.subject, &e))?
            .await
            .map_err(|e| client::classify_publish_error(&self.subject, &e))?;

        tracing::debug!(
            message_id = %message.message_id,
            subject = %self.subject,
            sequence = ack.sequence,
            duplicate = ack.duplicate,
            "Message published"
        );
        Ok(())
    }

    async fn receiver(&self) -> Result<Box<dyn QueueReceiver>> {
        let consumer_config =
            client::build_consumer_config(&self.consumer_name, &self.subject, &self.config);

        let consumer = self
            .stream
            .get_or_create_consumer(&self.consumer_name, consumer_config)
            .await
            .map_err(|e| {
                RelayError::Consumer(format!(
                    "Failed to create durable consumer '{}': {}",
                    self.consumer_name, e
                ))
            })?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| RelayError::Connection(format!("Failed to open message stream: {}", e)))?;

        tracing::info!(
            consumer = %self.consumer_name,
            subject = %self.subject,
            "Durable consumer attached"
        );

        Ok(Box::new(NatsReceiver { messages }))
    }

    async fn close(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| RelayError::Connection(format!("flush failed: {}", e)))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Pull-consumer message stream
pub struct NatsReceiver {
    messages: jetstream::consumer::pull::Stream,
}

#[async_trait]
impl QueueReceiver for NatsReceiver {
    async fn next(&mut self) -> Result<Option<Delivery>> {
        let msg = match self.messages.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                return Err(RelayError::Connection(format!("Message stream error: {}", e)))
            }
            None => return Ok(None),
        };

        let num_delivered = msg.info().map(|info| info.delivered as u64).unwrap_or(1);
        let attributes = header_attributes(msg.message.headers.as_ref());
        let payload = msg.message.payload.clone();

        let ack_msg = msg.clone();
        let discard_msg = msg;

        Ok(Some(Delivery::new(
            payload,
            attributes,
            num_delivered,
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    ack_msg
                        .ack()
                        .await
                        .map_err(|e| RelayError::Ack(e.to_string()))
                })
            },
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    discard_msg
                        .ack_with(AckKind::Term)
                        .await
                        .map_err(|e| RelayError::Ack(e.to_string()))
                })
            },
        )))
    }
}

/// JetStream headers for an outgoing message
fn message_headers(message: &QueueMessage) -> async_nats::HeaderMap {
    let mut headers = async_nats::HeaderMap::new();
    headers.insert(MSG_ID_HEADER, message.message_id.as_str());
    headers.insert(CONTENT_TYPE_HEADER, message.content_type.as_str());
    headers.insert(SUBJECT_HEADER, message.subject.as_str());
    for (key, value) in &message.attributes {
        headers.insert(key.as_str(), value.as_str());
    }
    headers
}

/// Copy the known event attributes out of the message headers
fn header_attributes(headers: Option<&async_nats::HeaderMap>) -> HashMap<String, String> {
    let Some(headers) = headers else {
        return HashMap::new();
    };

    [ATTR_ROCKET_ID, ATTR_SOURCE, ATTR_DESTINATION]
        .into_iter()
        .filter_map(|key| {
            headers
                .get(key)
                .map(|value| (key.to_string(), value.as_str().to_string()))
        })
        .collect()
}
