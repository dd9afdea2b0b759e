//! Server-sent event session for one connected viewer
//!
//! A `StreamSession` owns one broker subscription and turns it into SSE
//! frames: an opening comment, a `data:` frame per event, and a keep-alive
//! comment whenever no frame has gone out for a full heartbeat interval.
//!
//! The subscription is released exactly once on every exit path: queue
//! closed, shutdown token cancelled, or the session dropped because the
//! client went away mid-stream.

use crate::broker::{EventBroker, Subscription, SubscriptionId};
use crate::types::LaunchEvent;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;

/// Interval after which an idle stream emits a keep-alive comment
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Text of the comment frame written when a stream opens
pub const OPEN_COMMENT: &str = "stream-open";

/// Text of the idle heartbeat comment
pub const KEEP_ALIVE_COMMENT: &str = "keep-alive";

/// One SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// `: <text>\n\n`
    Comment(String),
    /// `data: <json>\n\n`
    Data(String),
}

impl SseFrame {
    /// Data frame carrying the event as JSON
    pub fn event(event: &LaunchEvent) -> serde_json::Result<Self> {
        serde_json::to_string(event).map(SseFrame::Data)
    }

    pub fn comment(text: impl Into<String>) -> Self {
        SseFrame::Comment(text.into())
    }

    pub fn is_keep_alive(&self) -> bool {
        matches!(self, SseFrame::Comment(text) if text == KEEP_ALIVE_COMMENT)
    }
}

/// Per-connection stream over a broker subscription
pub struct StreamSession {
    broker: Arc<EventBroker>,
    subscription: Subscription,
    released: bool,
    opened: bool,
    heartbeat_interval: Duration,
    heartbeat: Pin<Box<Sleep>>,
    cancel: CancellationToken,
}

impl StreamSession {
    /// Subscribe to `broker` and prepare a session
    ///
    /// The subscription is registered immediately, not on first poll, so the
    /// viewer sees every event published after this returns.
    pub fn open(broker: Arc<EventBroker>, cancel: CancellationToken) -> Self {
        let subscription = broker.subscribe();
        tracing::debug!(subscription = %subscription.id(), "Stream session opened");

        Self {
            broker,
            subscription,
            released: false,
            opened: false,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat: Box::pin(tokio::time::sleep(HEARTBEAT_INTERVAL)),
            cancel,
        }
    }

    /// Override the heartbeat interval
    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.heartbeat
            .as_mut()
            .reset(Instant::now() + self.heartbeat_interval);
        self
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Produce the next frame, or `None` once the session has ended
    pub async fn next_frame(&mut self) -> Option<SseFrame> {
        if self.released {
            return None;
        }
        if !self.opened {
            self.opened = true;
            self.rearm();
            return Some(SseFrame::comment(OPEN_COMMENT));
        }

        let frame = tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                tracing::debug!(subscription = %self.subscription.id(), "Stream session cancelled");
                None
            }
            next = self.subscription.recv() => match next {
                Some(event) => match SseFrame::event(&event) {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        tracing::warn!(
                            rocket_id = %event.rocket_id,
                            error = %e,
                            "Failed to encode event, ending stream"
                        );
                        None
                    }
                },
                None => {
                    tracing::debug!(subscription = %self.subscription.id(), "Subscription queue closed");
                    None
                }
            },
            _ = self.heartbeat.as_mut() => Some(SseFrame::comment(KEEP_ALIVE_COMMENT)),
        };

        match frame {
            Some(frame) => {
                self.rearm();
                Some(frame)
            }
            None => {
                self.release();
                None
            }
        }
    }

    /// Consume the session as a stream of frames
    ///
    /// Dropping the stream drops the session, which releases the subscription.
    pub fn into_stream(self) -> impl Stream<Item = SseFrame> + Send + 'static {
        futures::stream::unfold(self, |mut session| async move {
            session.next_frame().await.map(|frame| (frame, session))
        })
    }

    fn rearm(&mut self) {
        self.heartbeat
            .as_mut()
            .reset(Instant::now() + self.heartbeat_interval);
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.broker.unsubscribe(self.subscription.id());
            tracing::debug!(subscription = %self.subscription.id(), "Stream session closed");
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.release();
    }
}
