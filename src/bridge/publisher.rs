//! Publish entry points behind the HTTP publish endpoint
//!
//! `LocalPublisher` hands events straight to the broker (bridge disabled).
//! `QueuePublisher` enqueues them on the durable queue with retry; they reach
//! the broker through the queue listener.

use super::{QueueMessage, QueueTransport};
use crate::broker::EventBroker;
use crate::error::{RelayError, Result};
use crate::retry::{self, RetrySpec};
use crate::types::LaunchEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// Destination for locally published events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event; failures are surfaced, never dropped
    async fn publish(&self, event: &LaunchEvent) -> Result<()>;

    /// Publisher name (e.g. "local", "queue")
    fn name(&self) -> &str;
}

/// Publishes directly into the in-process broker
pub struct LocalPublisher {
    broker: Arc<EventBroker>,
}

impl LocalPublisher {
    pub fn new(broker: Arc<EventBroker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl EventPublisher for LocalPublisher {
    async fn publish(&self, event: &LaunchEvent) -> Result<()> {
        self.broker.publish(event.clone());
        tracing::info!(
            rocket_id = %event.rocket_id,
            source = %event.source,
            destination = %event.destination,
            "Dispatched launch event to local subscribers"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Publishes to the durable queue
pub struct QueuePublisher {
    transport: Arc<dyn QueueTransport>,
    retry: RetrySpec<RelayError>,
}

impl QueuePublisher {
    pub fn new(transport: Arc<dyn QueueTransport>, retry: RetrySpec<RelayError>) -> Self {
        Self { transport, retry }
    }
}

#[async_trait]
impl EventPublisher for QueuePublisher {
    async fn publish(&self, event: &LaunchEvent) -> Result<()> {
        // One message for all attempts so the queue can dedupe by id
        let message = QueueMessage::from_event(event)?;

        let sent = retry::execute(&self.retry, || self.transport.send(&message)).await;
        match sent {
            Ok(()) => {
                tracing::info!(
                    rocket_id = %event.rocket_id,
                    source = %event.source,
                    destination = %event.destination,
                    message_id = %message.message_id,
                    transport = self.transport.name(),
                    "Queued launch event"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    rocket_id = %event.rocket_id,
                    error = %e,
                    "Failed to enqueue launch event"
                );
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "queue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::QueueReceiver;
    use crate::retry::{Backoff, Jitter};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Transport that fails according to a script, then succeeds
    #[derive(Default)]
    struct ScriptedTransport {
        failures: Mutex<VecDeque<RelayError>>,
        sent: Mutex<Vec<QueueMessage>>,
        attempts: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn failing(failures: Vec<RelayError>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl QueueTransport for ScriptedTransport {
        async fn send(&self, message: &QueueMessage) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn receiver(&self) -> Result<Box<dyn QueueReceiver>> {
            Err(RelayError::Consumer("send-only".into()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn send_spec() -> RetrySpec<RelayError> {
        RetrySpec::new(
            "queue-send",
            4,
            Backoff {
                base: Duration::from_millis(200),
                max: Duration::from_secs(5),
                jitter: Jitter::None,
            },
            RelayError::is_transient,
        )
    }

    #[tokio::test]
    async fn test_local_publisher_reaches_broker() {
        let broker = Arc::new(EventBroker::new());
        let mut sub = broker.subscribe();
        let publisher = LocalPublisher::new(broker.clone());

        let event = LaunchEvent::now("Earth", "Mars", "abc123");
        publisher.publish(&event).await.unwrap();

        assert_eq!(sub.recv().await.unwrap(), event);
        assert_eq!(broker.latest().unwrap(), event);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_publisher_retries_transient() {
        let transport = Arc::new(ScriptedTransport::failing(vec![
            RelayError::Timeout("ack".into()),
            RelayError::Connection("reset".into()),
        ]));
        let publisher = QueuePublisher::new(transport.clone(), send_spec());

        let event = LaunchEvent::now("Earth", "Mars", "abc123");
        publisher.publish(&event).await.unwrap();

        assert_eq!(*transport.attempts.lock().unwrap(), 3);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].decode().unwrap(), event);
        assert_eq!(sent[0].attributes["rocketId"], "abc123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_publisher_surfaces_fatal() {
        let transport = Arc::new(ScriptedTransport::failing(vec![RelayError::Publish {
            subject: "rocket-messages".into(),
            reason: "no stream".into(),
        }]));
        let publisher = QueuePublisher::new(transport.clone(), send_spec());

        let err = publisher
            .publish(&LaunchEvent::now("Earth", "Mars", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Publish { .. }));
        assert_eq!(*transport.attempts.lock().unwrap(), 1);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_publisher_surfaces_exhaustion() {
        let transport = Arc::new(ScriptedTransport::failing(
            (0..10).map(|i| RelayError::Timeout(format!("t{}", i))).collect(),
        ));
        let publisher = QueuePublisher::new(transport.clone(), send_spec());

        let err = publisher
            .publish(&LaunchEvent::now("Earth", "Mars", "x"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(*transport.attempts.lock().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_publisher_keeps_message_id_across_retries() {
        #[derive(Default)]
        struct IdRecorder {
            ids: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl QueueTransport for IdRecorder {
            async fn send(&self, message: &QueueMessage) -> Result<()> {
                let mut ids = self.ids.lock().unwrap();
                ids.push(message.message_id.clone());
                if ids.len() < 2 {
                    Err(RelayError::Timeout("ack".into()))
                } else {
                    Ok(())
                }
            }

            async fn receiver(&self) -> Result<Box<dyn QueueReceiver>> {
                Err(RelayError::Consumer("send-only".into()))
            }

            fn name(&self) -> &str {
                "ids"
            }
        }

        let transport = Arc::new(IdRecorder::default());
        let publisher = QueuePublisher::new(transport.clone(), send_spec());
        publisher
            .publish(&LaunchEvent::now("Earth", "Mars", "same"))
            .await
            .unwrap();

        let ids = transport.ids.lock().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
    }
}
