//! In-process queue transport
//!
//! Behaves like a single work queue: every message goes to exactly one
//! receiver, acks and discards are counted. Used for local development and
//! tests; nothing survives a restart.

use super::{Delivery, QueueMessage, QueueReceiver, QueueTransport};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    acked: AtomicU64,
    discarded: AtomicU64,
}

/// In-memory queue shared by its publisher and receivers
pub struct MemoryQueue {
    sender: mpsc::UnboundedSender<QueueMessage>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<QueueMessage>>>,
    counters: Arc<Counters>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Messages accepted by `send`
    pub fn sent(&self) -> u64 {
        self.counters.sent.load(Ordering::SeqCst)
    }

    /// Deliveries acknowledged by a receiver
    pub fn acked(&self) -> u64 {
        self.counters.acked.load(Ordering::SeqCst)
    }

    /// Deliveries dropped as unprocessable
    pub fn discarded(&self) -> u64 {
        self.counters.discarded.load(Ordering::SeqCst)
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn send(&self, message: &QueueMessage) -> Result<()> {
        self.sender
            .send(message.clone())
            .map_err(|_| RelayError::Unavailable("memory queue closed".to_string()))?;
        self.counters.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn receiver(&self) -> Result<Box<dyn QueueReceiver>> {
        Ok(Box::new(MemoryReceiver {
            queue: self.receiver.clone(),
            counters: self.counters.clone(),
        }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

struct MemoryReceiver {
    queue: Arc<Mutex<mpsc::UnboundedReceiver<QueueMessage>>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl QueueReceiver for MemoryReceiver {
    async fn next(&mut self) -> Result<Option<Delivery>> {
        let Some(message) = self.queue.lock().await.recv().await else {
            return Ok(None);
        };

        let acked = self.counters.clone();
        let discarded = self.counters.clone();

        Ok(Some(Delivery::new(
            message.body,
            message.attributes,
            1,
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    acked.acked.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            },
            move || -> BoxFuture<'static, Result<()>> {
                Box::pin(async move {
                    discarded.discarded.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            },
        )))
    }
}
