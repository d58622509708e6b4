//! Durable queue ports used to decouple task creation from persistence.

use crate::task::domain::TaskRecord;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for queue operations.
pub type TaskQueueResult<T> = Result<T, TaskQueueError>;

/// Producer side of the task submission queue.
#[async_trait]
pub trait TaskPublisher: Send + Sync {
    /// Durably enqueues one serialised task record.
    async fn publish(&self, record: &TaskRecord) -> TaskQueueResult<()>;
}

/// Consumer side of the task submission queue.
///
/// Deliveries are acknowledged on receipt, so the same record may be
/// delivered more than once and consumers must be idempotent.
#[async_trait]
pub trait TaskConsumer: Send + Sync {
    /// Waits for the next raw payload.
    ///
    /// Returns `None` when the implementation's poll interval elapsed with
    /// nothing to deliver.
    async fn next_delivery(&self) -> TaskQueueResult<Option<Vec<u8>>>;
}

/// Errors returned by queue implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskQueueError {
    /// The publish deadline elapsed.
    #[error("queue operation timed out after {0:?}")]
    Timeout(Duration),

    /// The record could not be encoded.
    #[error("failed to encode queue payload: {0}")]
    Serialization(String),

    /// The broker could not be reached or rejected the operation.
    #[error("queue unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskQueueError {
    /// Wraps a broker error.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
