use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bridge::EventPublisher;
use crate::broker::EventBroker;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<EventBroker>,
    pub publisher: Arc<dyn EventPublisher>,
    /// Cancelled when the server shuts down; open streams end with it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        broker: Arc<EventBroker>,
        publisher: Arc<dyn EventPublisher>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            broker,
            publisher,
            shutdown,
        }
    }
}
