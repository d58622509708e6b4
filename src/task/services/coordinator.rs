//! Facade exposing the coordinator operations to transports.

use super::{
    AssignmentEngine, ClaimOutcome, CreateTaskRequest, DispatchResult, SubmissionGate,
    TaskQueries,
};
use crate::account::domain::AccountId;
use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskPublisher, TaskStore},
};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use std::time::Duration;

/// Coordinator wired to trait objects, as used by the server.
pub type DynTaskCoordinator = TaskCoordinator<dyn TaskStore, dyn TaskPublisher, DefaultClock>;

/// Single entry point for every transport.
///
/// The WebSocket session and the REST handlers both call through here, so
/// there is exactly one path into [`AssignmentEngine::claim_next`].
pub struct TaskCoordinator<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    gate: SubmissionGate<S, P, C>,
    engine: AssignmentEngine<S, C>,
    queries: TaskQueries<S>,
}

impl<S, P, C> Clone for TaskCoordinator<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            engine: self.engine.clone(),
            queries: self.queries.clone(),
        }
    }
}

impl<S, P, C> TaskCoordinator<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    /// Wires the services over shared store, publisher, and clock.
    #[must_use]
    pub fn new(store: Arc<S>, publisher: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            gate: SubmissionGate::new(Arc::clone(&store), publisher, Arc::clone(&clock)),
            engine: AssignmentEngine::new(Arc::clone(&store), clock),
            queries: TaskQueries::new(store),
        }
    }

    /// Overrides the publish deadline of the submission gate.
    #[must_use]
    pub fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.gate = self.gate.with_publish_timeout(publish_timeout);
        self
    }

    /// `CreateTask`. See [`SubmissionGate::create_task`].
    ///
    /// # Errors
    ///
    /// Propagates [`SubmissionGate::create_task`] errors.
    pub async fn create_task(&self, request: CreateTaskRequest) -> DispatchResult<Task> {
        self.gate.create_task(request).await
    }

    /// `ClaimNext`. See [`AssignmentEngine::claim_next`].
    ///
    /// # Errors
    ///
    /// Propagates [`AssignmentEngine::claim_next`] errors.
    pub async fn claim_next(&self, worker: AccountId) -> DispatchResult<ClaimOutcome> {
        self.engine.claim_next(worker).await
    }

    /// `ReleaseClaim`. See [`AssignmentEngine::release_claim`].
    ///
    /// # Errors
    ///
    /// Propagates [`AssignmentEngine::release_claim`] errors.
    pub async fn release_claim(&self, task_id: TaskId) -> DispatchResult<()> {
        self.engine.release_claim(task_id).await
    }

    /// `Submit`. See [`AssignmentEngine::submit`].
    ///
    /// # Errors
    ///
    /// Propagates [`AssignmentEngine::submit`] errors.
    pub async fn submit(
        &self,
        task_id: TaskId,
        worker: AccountId,
        solution: &str,
    ) -> DispatchResult<Task> {
        self.engine.submit(task_id, worker, solution).await
    }

    /// `ReportFailure`. See [`AssignmentEngine::report_failure`].
    ///
    /// # Errors
    ///
    /// Propagates [`AssignmentEngine::report_failure`] errors.
    pub async fn report_failure(
        &self,
        task_id: TaskId,
        worker: AccountId,
        reason: &str,
    ) -> DispatchResult<Task> {
        self.engine.report_failure(task_id, worker, reason).await
    }

    /// `GetTask`. See [`TaskQueries::get_task`].
    ///
    /// # Errors
    ///
    /// Propagates [`TaskQueries::get_task`] errors.
    pub async fn get_task(&self, task_id: TaskId, requester: AccountId) -> DispatchResult<Task> {
        self.queries.get_task(task_id, requester).await
    }

    /// `ListForRequester`. See [`TaskQueries::list_for_requester`].
    ///
    /// # Errors
    ///
    /// Propagates [`TaskQueries::list_for_requester`] errors.
    pub async fn list_for_requester(&self, requester: AccountId) -> DispatchResult<Vec<Task>> {
        self.queries.list_for_requester(requester).await
    }

    /// `QueueDepth`. See [`TaskQueries::queue_depth`].
    ///
    /// # Errors
    ///
    /// Propagates [`TaskQueries::queue_depth`] errors.
    pub async fn queue_depth(&self) -> DispatchResult<u64> {
        self.queries.queue_depth().await
    }
}
