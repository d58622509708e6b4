//! Assignment Engine: atomic claim, compensation, and close-out.

use super::{DispatchError, DispatchResult};
use crate::account::domain::AccountId;
use crate::task::{
    domain::{FailureReason, SolutionToken, Task, TaskId},
    ports::TaskStore,
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The task now assigned to the caller.
    Claimed(Task),
    /// Nothing pending and unclaimed was visible.
    NoTaskAvailable,
}

/// Hands out pending tasks one at a time and closes them out.
///
/// The store's conditional updates are the only synchronisation; the engine
/// holds no locks of its own, so any number of engines in any number of
/// processes may share one store.
pub struct AssignmentEngine<S, C>
where
    S: TaskStore + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for AssignmentEngine<S, C>
where
    S: TaskStore + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> AssignmentEngine<S, C>
where
    S: TaskStore + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates an engine over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Claims the oldest pending, unclaimed task for `worker`.
    ///
    /// When another caller wins the conditional update for the selected row
    /// the selection is repeated, so a lost race never surfaces as an empty
    /// queue while other tasks remain.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StoreUnavailable`] when the store fails.
    pub async fn claim_next(&self, worker: AccountId) -> DispatchResult<ClaimOutcome> {
        loop {
            let Some(candidate) = self.store.find_oldest_claimable().await? else {
                debug!(worker_id = %worker, "no task available");
                return Ok(ClaimOutcome::NoTaskAvailable);
            };

            let candidate_id = candidate.id();
            match self
                .store
                .try_claim(candidate_id, worker, self.clock.utc())
                .await?
            {
                Some(task) => {
                    info!(
                        task_id = %task.id(),
                        worker_id = %worker,
                        attempts = task.attempts(),
                        "task claimed"
                    );
                    return Ok(ClaimOutcome::Claimed(task));
                }
                None => {
                    debug!(
                        task_id = %candidate_id,
                        worker_id = %worker,
                        "lost claim race, retrying"
                    );
                }
            }
        }
    }

    /// Returns an assigned task to the pool.
    ///
    /// Used only when the claimed task could not be delivered. Releasing a
    /// task that is already pending, or already closed, changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StoreUnavailable`] when the store fails.
    pub async fn release_claim(&self, task_id: TaskId) -> DispatchResult<()> {
        self.store.release_claim(task_id, self.clock.utc()).await?;
        info!(task_id = %task_id, "task claim released");
        Ok(())
    }

    /// Records a solution from the worker holding the claim.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidInput`] for an empty token.
    /// - [`DispatchError::NotYourTask`] when the task is unknown, closed, or
    ///   assigned to someone else.
    /// - [`DispatchError::StoreUnavailable`] when the store fails.
    pub async fn submit(
        &self,
        task_id: TaskId,
        worker: AccountId,
        solution: &str,
    ) -> DispatchResult<Task> {
        let token = SolutionToken::new(solution).map_err(DispatchError::InvalidInput)?;
        let solved = self
            .store
            .record_solution(task_id, worker, &token, self.clock.utc())
            .await?
            .ok_or(DispatchError::NotYourTask(task_id))?;
        info!(task_id = %task_id, worker_id = %worker, "task solved");
        Ok(solved)
    }

    /// Marks the task failed on behalf of the worker holding the claim.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidInput`] for an empty reason.
    /// - [`DispatchError::NotYourTask`] when the task is unknown, closed, or
    ///   assigned to someone else.
    /// - [`DispatchError::StoreUnavailable`] when the store fails.
    pub async fn report_failure(
        &self,
        task_id: TaskId,
        worker: AccountId,
        reason: &str,
    ) -> DispatchResult<Task> {
        let failure = FailureReason::new(reason).map_err(DispatchError::InvalidInput)?;
        let failed = self
            .store
            .record_failure(task_id, worker, &failure, self.clock.utc())
            .await?
            .ok_or(DispatchError::NotYourTask(task_id))?;
        info!(task_id = %task_id, worker_id = %worker, reason = failure.as_str(), "task failed");
        Ok(failed)
    }
}
