//! In-process fan-out broker
//!
//! `EventBroker` is the shared hub between publishers (HTTP publish, queue
//! listener) and live subscribers (SSE sessions). Every registered
//! subscription owns an unbounded queue; a publish pushes the event into all
//! of them and overwrites the "latest" slot.
//!
//! Queues are unbounded: a consumer that stops reading grows memory until it
//! unsubscribes.

use crate::types::LaunchEvent;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;

/// Opaque handle identifying one subscription
///
/// Never reused within the lifetime of a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One live consumer: its handle and the receiving end of its queue
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<LaunchEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event; `None` once the queue is closed
    pub async fn recv(&mut self) -> Option<LaunchEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<LaunchEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Process-wide fan-out registry
///
/// Construct one instance at startup and share it by `Arc` with every
/// handler and background task that needs it.
#[derive(Debug, Default)]
pub struct EventBroker {
    subscribers: DashMap<SubscriptionId, mpsc::UnboundedSender<LaunchEvent>>,
    latest: RwLock<Option<LaunchEvent>>,
    next_id: AtomicU64,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription with an unbounded queue
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.insert(id, sender);

        tracing::debug!(subscription = %id, total = self.subscribers.len(), "Subscribed");
        Subscription { id, receiver }
    }

    /// Remove a subscription
    ///
    /// Idempotent: unknown or already removed handles are ignored. Returns
    /// whether a registration was actually removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, total = self.subscribers.len(), "Unsubscribed");
        }
        removed
    }

    /// Record `event` as latest and push it to every registered subscription
    ///
    /// Never blocks on a subscriber. Subscriptions whose receiver was dropped
    /// without unsubscribing are pruned after the fan-out pass.
    pub fn publish(&self, event: LaunchEvent) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(event.clone());

        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            if entry.value().send(event.clone()).is_err() {
                closed.push(*entry.key());
            }
        }

        // Removal must happen outside the iteration, which holds shard locks.
        for id in closed {
            self.subscribers.remove(&id);
            tracing::debug!(subscription = %id, "Pruned closed subscription");
        }
    }

    /// Most recently published event, if any
    pub fn latest(&self) -> Option<LaunchEvent> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of live registrations
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drop every registration, closing all subscription queues
    ///
    /// Called at shutdown so open streams end.
    pub fn close(&self) {
        let count = self.subscribers.len();
        self.subscribers.clear();
        tracing::info!(closed = count, "Broker closed all subscriptions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn event(rocket_id: &str) -> LaunchEvent {
        LaunchEvent::now("Earth", "Mars", rocket_id)
    }

    #[test]
    fn test_latest_empty_before_publish() {
        let broker = EventBroker::new();
        assert!(broker.latest().is_none());
    }

    #[test]
    fn test_latest_tracks_most_recent() {
        let broker = EventBroker::new();
        broker.publish(event("a"));
        broker.publish(event("b"));
        broker.publish(event("c"));
        assert_eq!(broker.latest().unwrap().rocket_id, "c");
    }

    #[test]
    fn test_publish_without_subscribers_sets_latest() {
        let broker = EventBroker::new();
        broker.publish(event("lonely"));
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.latest().unwrap().rocket_id, "lonely");
    }

    #[tokio::test]
    async fn test_subscriber_receives_all_in_order() {
        let broker = EventBroker::new();
        let mut sub = broker.subscribe();

        for i in 0..100 {
            broker.publish(event(&format!("r{}", i)));
        }

        for i in 0..100 {
            let received = sub.recv().await.unwrap();
            assert_eq!(received.rocket_id, format!("r{}", i));
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let broker = EventBroker::new();
        let mut subs: Vec<_> = (0..5).map(|_| broker.subscribe()).collect();

        broker.publish(event("shared"));

        for sub in subs.iter_mut() {
            assert_eq!(sub.recv().await.unwrap().rocket_id, "shared");
        }
    }

    #[test]
    fn test_no_delivery_of_events_before_subscribe() {
        let broker = EventBroker::new();
        broker.publish(event("early"));
        let mut sub = broker.subscribe();
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let broker = EventBroker::new();
        let mut sub = broker.subscribe();
        assert_eq!(broker.subscriber_count(), 1);

        assert!(broker.unsubscribe(sub.id()));
        assert!(!broker.unsubscribe(sub.id()));
        assert_eq!(broker.subscriber_count(), 0);

        broker.publish(event("after"));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_unsubscribe_unknown_handle() {
        let broker = EventBroker::new();
        let other = EventBroker::new();
        let foreign = other.subscribe();
        assert!(!broker.unsubscribe(foreign.id()));
    }

    #[test]
    fn test_unsubscribe_leaves_others_intact() {
        let broker = EventBroker::new();
        let a = broker.subscribe();
        let mut b = broker.subscribe();

        broker.unsubscribe(a.id());
        broker.publish(event("x"));

        assert_eq!(b.try_recv().unwrap().rocket_id, "x");
        assert_eq!(broker.subscriber_count(), 1);
    }

    #[test]
    fn test_handles_are_unique() {
        let broker = EventBroker::new();
        let a = broker.subscribe();
        broker.unsubscribe(a.id());
        let b = broker.subscribe();
        assert_ne!(a.id(), b.id());
        assert_eq!(b.id().to_string(), "sub-1");
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let broker = EventBroker::new();
        let sub = broker.subscribe();
        let _kept = broker.subscribe();
        drop(sub);

        broker.publish(event("p"));
        assert_eq!(broker.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let broker = EventBroker::new();
        let mut sub = broker.subscribe();
        broker.publish(event("last"));
        broker.close();

        assert_eq!(sub.recv().await.unwrap().rocket_id, "last");
        assert!(sub.recv().await.is_none());
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_publishers_and_subscribers() {
        let broker = Arc::new(EventBroker::new());
        let mut watcher = broker.subscribe();

        let mut handles = Vec::new();
        for p in 0..8 {
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    broker.publish(event(&format!("p{}-{}", p, i)));
                    let churn = broker.subscribe();
                    broker.unsubscribe(churn.id());
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let mut count = 0;
        let mut last_seen = [None::<usize>; 8];
        while let Some(e) = watcher.try_recv() {
            // Events from a single publisher keep their relative order
            let (p, i) = e.rocket_id[1..].split_once('-').unwrap();
            let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last_seen[p] {
                assert!(i > prev);
            }
            last_seen[p] = Some(i);
            count += 1;
        }
        assert_eq!(count, 8 * 50);
        assert_eq!(broker.subscriber_count(), 1);
    }
}
