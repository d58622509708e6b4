//! Error taxonomy shared by the coordinator services.

use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::{TaskQueueError, TaskStoreError},
};
use thiserror::Error;

/// Errors surfaced by coordinator operations.
///
/// Empty states (no task to claim) are not errors and are reported through
/// [`super::ClaimOutcome`] instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request was malformed; the caller can correct it.
    #[error("invalid input: {0}")]
    InvalidInput(#[source] TaskDomainError),

    /// The task is unknown, closed, or assigned to another worker.
    #[error("task {0} is not assigned to this worker")]
    NotYourTask(TaskId),

    /// The task does not exist or belongs to another requester.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The durable queue rejected or timed out the publish.
    #[error("failed to publish task to queue: {0}")]
    QueuePublishFailure(#[source] TaskQueueError),

    /// The task store could not complete the operation.
    #[error(transparent)]
    StoreUnavailable(#[from] TaskStoreError),
}

/// Result type for coordinator operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
