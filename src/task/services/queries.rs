//! Read-side operations scoped to the caller.

use super::{DispatchError, DispatchResult};
use crate::account::domain::AccountId;
use crate::task::{
    domain::{Task, TaskId},
    ports::TaskStore,
};
use std::sync::Arc;

/// Requester-scoped task lookups and queue depth.
pub struct TaskQueries<S>
where
    S: TaskStore + ?Sized,
{
    store: Arc<S>,
}

impl<S> Clone for TaskQueries<S>
where
    S: TaskStore + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> TaskQueries<S>
where
    S: TaskStore + ?Sized,
{
    /// Creates a query service over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns task `task_id` if it was submitted by `requester`.
    ///
    /// A task owned by someone else is reported exactly like a missing one.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotFound`] or
    /// [`DispatchError::StoreUnavailable`].
    pub async fn get_task(&self, task_id: TaskId, requester: AccountId) -> DispatchResult<Task> {
        self.store
            .find_by_id(task_id)
            .await?
            .filter(|task| task.requester_id() == requester)
            .ok_or(DispatchError::NotFound(task_id))
    }

    /// Returns every task submitted by `requester`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StoreUnavailable`] when the store fails or
    /// holds a row that cannot be read back.
    pub async fn list_for_requester(&self, requester: AccountId) -> DispatchResult<Vec<Task>> {
        Ok(self.store.list_for_requester(requester).await?)
    }

    /// Counts pending tasks.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StoreUnavailable`] when the store fails.
    pub async fn queue_depth(&self) -> DispatchResult<u64> {
        Ok(self.store.count_pending().await?)
    }
}
