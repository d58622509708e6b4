//! Store port holding the authoritative state of every task.

use crate::account::domain::AccountId;
use crate::task::domain::{FailureReason, NewTask, SolutionToken, Task, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Task persistence contract.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new pending task and returns it with its generated
    /// identifier.
    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task>;

    /// Inserts `task`, or replaces the mutable fields of the existing row
    /// with the same identifier while keeping its `created_at`.
    ///
    /// Only a stored row that is still pending with no solver is replaced,
    /// and `attempts` never decreases. A claimed or closed row is left
    /// untouched whatever the snapshot's timestamps say, so a late or
    /// clock-skewed redelivery never rolls back a claim or a close.
    /// Returns whether the row was written.
    async fn upsert(&self, task: &Task) -> TaskStoreResult<bool>;

    /// Finds a task by identifier.
    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns the oldest task that is pending with no solver.
    ///
    /// Ties on `created_at` are broken by ascending identifier.
    async fn find_oldest_claimable(&self) -> TaskStoreResult<Option<Task>>;

    /// Assigns task `id` to `worker` if it is still pending with no solver.
    ///
    /// Returns the updated task, or `None` when the condition no longer
    /// holds because another caller claimed it first.
    async fn try_claim(
        &self,
        id: TaskId,
        worker: AccountId,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>>;

    /// Clears the solver and returns an assigned task to `pending`.
    ///
    /// Does not compare against the current solver. Pending, solved, and
    /// failed tasks are left untouched, so repeated calls are no-ops.
    async fn release_claim(&self, id: TaskId, at: DateTime<Utc>) -> TaskStoreResult<()>;

    /// Records `token` on task `id` if it is assigned to `worker`.
    ///
    /// Returns `None` when the task is unknown, assigned elsewhere, or
    /// already closed.
    async fn record_solution(
        &self,
        id: TaskId,
        worker: AccountId,
        token: &SolutionToken,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>>;

    /// Marks task `id` failed if it is assigned to `worker`.
    ///
    /// Returns `None` when the task is unknown, assigned elsewhere, or
    /// already closed.
    async fn record_failure(
        &self,
        id: TaskId,
        worker: AccountId,
        reason: &FailureReason,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>>;

    /// Returns every task submitted by `requester`, oldest first.
    async fn list_for_requester(&self, requester: AccountId) -> TaskStoreResult<Vec<Task>>;

    /// Counts tasks in `pending` status.
    async fn count_pending(&self) -> TaskStoreResult<u64>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A stored row could not be turned back into a valid task.
    #[error("corrupt task row {id}: {reason}")]
    CorruptRow {
        /// Raw identifier of the row.
        id: i64,
        /// Conversion failure.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
