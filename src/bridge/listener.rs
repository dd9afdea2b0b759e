//! Queue listener: drains the durable queue into the broker
//!
//! Runs for the lifetime of the service. Each delivery is decoded, published
//! to the broker, and only then acknowledged, so a crash before the publish
//! leaves the message for redelivery. Messages that cannot be decoded are
//! logged and discarded. Receive failures never stop the listener; it
//! reopens the receiver with backoff until shutdown.

use super::{Delivery, QueueReceiver, QueueTransport, ATTR_ROCKET_ID};
use crate::broker::EventBroker;
use crate::error::RelayError;
use crate::retry::{self, RetrySpec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a receiver session ended
enum Drained {
    Shutdown,
    Ended,
    Failed(RelayError),
}

/// Long-running consumer feeding queue messages to the broker
pub struct QueueListener {
    transport: Arc<dyn QueueTransport>,
    broker: Arc<EventBroker>,
    retry: RetrySpec<RelayError>,
}

impl QueueListener {
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        broker: Arc<EventBroker>,
        retry: RetrySpec<RelayError>,
    ) -> Self {
        Self {
            transport,
            broker,
            retry,
        }
    }

    /// Consume until `shutdown` is cancelled, then close the transport
    ///
    /// A message already being handled when shutdown fires is finished
    /// (published and acked) before returning.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(transport = self.transport.name(), "Queue listener started");
        let mut failures = 0u32;

        while !shutdown.is_cancelled() {
            let opened = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                opened = retry::execute(&self.retry, || self.transport.receiver()) => opened,
            };

            let outcome = match opened {
                Ok(mut receiver) => self.drain(receiver.as_mut(), &shutdown, &mut failures).await,
                Err(e) => Drained::Failed(e),
            };

            match outcome {
                Drained::Shutdown => break,
                Drained::Ended => tracing::info!("Queue stream ended, reopening"),
                Drained::Failed(e) => {
                    tracing::error!(error = %e, kind = e.as_label(), "Queue receive failed, reopening");
                }
            }

            let pause = self.retry.backoff.delay(failures);
            failures = failures.saturating_add(1);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        if let Err(e) = self.transport.close().await {
            tracing::warn!(error = %e, "Failed to close queue transport");
        }
        tracing::info!("Queue listener stopped");
    }

    async fn drain(
        &self,
        receiver: &mut dyn QueueReceiver,
        shutdown: &CancellationToken,
        failures: &mut u32,
    ) -> Drained {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Drained::Shutdown,
                next = receiver.next() => next,
            };

            match next {
                Ok(Some(delivery)) => {
                    *failures = 0;
                    self.handle(delivery).await;
                }
                Ok(None) => return Drained::Ended,
                Err(e) => return Drained::Failed(e),
            }
        }
    }

    async fn handle(&self, delivery: Delivery) {
        match delivery.decode() {
            Ok(event) => {
                let rocket_id = event.rocket_id.clone();
                self.broker.publish(event);
                match delivery.ack().await {
                    Ok(()) => tracing::debug!(rocket_id = %rocket_id, "Queue message delivered"),
                    Err(e) => tracing::warn!(
                        rocket_id = %rocket_id,
                        error = %e,
                        "Failed to ack queue message, it may be redelivered"
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(
                    rocket_id = delivery.attributes.get(ATTR_ROCKET_ID).map(String::as_str),
                    num_delivered = delivery.num_delivered,
                    error = %e,
                    "Discarding malformed queue message"
                );
                if let Err(e) = delivery.discard().await {
                    tracing::warn!(error = %e, "Failed to discard queue message");
                }
            }
        }
    }
}
