//! In-memory durable-queue stand-in.

use crate::task::{
    domain::TaskRecord,
    ports::{TaskConsumer, TaskPublisher, TaskQueueError, TaskQueueResult},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};

/// Single-process queue that hands each published payload to one consumer.
///
/// The queue can be switched into an unavailable state to exercise publish
/// failure handling.
#[derive(Debug, Clone)]
pub struct InMemoryTaskQueue {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    unavailable: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl InMemoryTaskQueue {
    /// Creates an empty queue whose consumer polls every `poll_interval`.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            unavailable: Arc::new(AtomicBool::new(false)),
            poll_interval,
        }
    }

    /// Simulates the broker going away or coming back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Enqueues a raw payload, bypassing serialisation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskQueueError::Unavailable`] when the queue is marked
    /// unavailable or the consumer side has been dropped.
    pub fn publish_raw(&self, payload: Vec<u8>) -> TaskQueueResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaskQueueError::unavailable(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "in-memory queue marked unavailable",
            )));
        }
        self.sender
            .send(payload)
            .map_err(|err| TaskQueueError::unavailable(std::io::Error::other(err.to_string())))
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[async_trait]
impl TaskPublisher for InMemoryTaskQueue {
    async fn publish(&self, record: &TaskRecord) -> TaskQueueResult<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|err| TaskQueueError::Serialization(err.to_string()))?;
        self.publish_raw(payload)
    }
}

#[async_trait]
impl TaskConsumer for InMemoryTaskQueue {
    async fn next_delivery(&self) -> TaskQueueResult<Option<Vec<u8>>> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(self.poll_interval, receiver.recv()).await {
            Ok(payload) => Ok(payload),
            Err(_elapsed) => Ok(None),
        }
    }
}
