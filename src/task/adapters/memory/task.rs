//! In-memory task store.
//!
//! All conditional updates run under a single write lock, which gives the
//! same compare-and-set semantics as the `PostgreSQL` adapter's guarded
//! `UPDATE` statements.

use crate::account::domain::AccountId;
use crate::task::{
    domain::{FailureReason, NewTask, SolutionToken, Task, TaskId, TaskStatus},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: BTreeMap<TaskId, Task>,
    last_id: i64,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskStoreResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskStoreResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    /// Applies `mutate` to task `id` under the write lock, keeping the change
    /// only when the guard inside `mutate` succeeds.
    fn mutate_if<F>(&self, id: TaskId, mutate: F) -> TaskStoreResult<Option<Task>>
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let mut state = self.write()?;
        let Some(current) = state.tasks.get(&id) else {
            return Ok(None);
        };
        let mut candidate = current.clone();
        if !mutate(&mut candidate) {
            return Ok(None);
        }
        state.tasks.insert(id, candidate.clone());
        Ok(Some(candidate))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task> {
        let mut state = self.write()?;
        let next_id = state.last_id.saturating_add(1);
        let id = TaskId::new(next_id).map_err(TaskStoreError::persistence)?;
        let created = task.clone().into_task(id);
        state.last_id = next_id;
        state.tasks.insert(id, created.clone());
        Ok(created)
    }

    async fn upsert(&self, task: &Task) -> TaskStoreResult<bool> {
        let mut state = self.write()?;
        let stored = match state.tasks.get(&task.id()) {
            Some(existing) => match task.clone().reconciled_over(existing) {
                Some(merged) => merged,
                None => return Ok(false),
            },
            None => task.clone(),
        };
        state.last_id = state.last_id.max(task.id().value());
        state.tasks.insert(task.id(), stored);
        Ok(true)
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn find_oldest_claimable(&self) -> TaskStoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.is_claimable())
            .min_by_key(|task| (task.created_at(), task.id()))
            .cloned())
    }

    async fn try_claim(
        &self,
        id: TaskId,
        worker: AccountId,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        self.mutate_if(id, |task| task.claim(worker, at).is_ok())
    }

    async fn release_claim(&self, id: TaskId, at: DateTime<Utc>) -> TaskStoreResult<()> {
        self.mutate_if(id, |task| task.release(at))?;
        Ok(())
    }

    async fn record_solution(
        &self,
        id: TaskId,
        worker: AccountId,
        token: &SolutionToken,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        self.mutate_if(id, |task| task.record_solution(worker, token.clone(), at).is_ok())
    }

    async fn record_failure(
        &self,
        id: TaskId,
        worker: AccountId,
        reason: &FailureReason,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        self.mutate_if(id, |task| task.record_failure(worker, reason.clone(), at).is_ok())
    }

    async fn list_for_requester(&self, requester: AccountId) -> TaskStoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.requester_id() == requester)
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    async fn count_pending(&self) -> TaskStoreResult<u64> {
        let state = self.read()?;
        let pending = state
            .tasks
            .values()
            .filter(|task| matches!(task.status(), TaskStatus::Pending))
            .count();
        u64::try_from(pending).map_err(TaskStoreError::persistence)
    }
}
