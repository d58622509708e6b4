//! Queue Reconciler: drains deliveries into the task store.

use super::DispatchResult;
use crate::task::{
    domain::{TaskId, TaskRecord},
    ports::{TaskConsumer, TaskStore},
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default pause after a failed read or write before draining again.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The record was written to the store.
    Applied(TaskId),
    /// The stored task had already been claimed or closed.
    Stale(TaskId),
    /// The payload could not be decoded and was discarded.
    Dropped,
}

/// Single consumer that makes the store reflect queue deliveries.
///
/// Deliveries are at-least-once; applying the same record twice leaves the
/// store as applying it once would.
pub struct QueueReconciler<S, Q, C>
where
    S: TaskStore + ?Sized,
    Q: TaskConsumer + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    consumer: Arc<Q>,
    clock: Arc<C>,
    error_backoff: Duration,
}

impl<S, Q, C> QueueReconciler<S, Q, C>
where
    S: TaskStore + ?Sized,
    Q: TaskConsumer + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler reading from `consumer` into `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, consumer: Arc<Q>, clock: Arc<C>) -> Self {
        Self {
            store,
            consumer,
            clock,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// Overrides the pause applied after a read or write error.
    #[must_use]
    pub const fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    /// Applies one raw delivery.
    ///
    /// Payloads that are not valid task records are logged and dropped; they
    /// are not retried.
    ///
    /// # Errors
    ///
    /// Returns [`super::DispatchError::StoreUnavailable`] when the upsert
    /// fails.
    pub async fn reconcile(&self, payload: &[u8]) -> DispatchResult<ReconcileOutcome> {
        let record: TaskRecord = match serde_json::from_slice(payload) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(error = %err, bytes = payload.len(), "dropping undecodable task payload");
                return Ok(ReconcileOutcome::Dropped);
            }
        };

        let record_id = record.id;
        let task = match record.into_task(self.clock.utc()) {
            Ok(task) => task,
            Err(err) => {
                warn!(task_id = record_id, error = %err, "dropping invalid task payload");
                return Ok(ReconcileOutcome::Dropped);
            }
        };

        let task_id = task.id();
        if self.store.upsert(&task).await? {
            debug!(task_id = %task_id, status = task.status().as_str(), "task reconciled");
            Ok(ReconcileOutcome::Applied(task_id))
        } else {
            debug!(task_id = %task_id, "stale delivery ignored");
            Ok(ReconcileOutcome::Stale(task_id))
        }
    }

    /// Drains the queue until `shutdown` resolves.
    ///
    /// Read and write failures are logged and followed by a short pause; they
    /// never end the loop.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        info!("queue reconciler started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                delivery = self.consumer.next_delivery() => {
                    match delivery {
                        Ok(Some(payload)) => {
                            if let Err(err) = self.reconcile(&payload).await {
                                error!(error = %err, "failed to reconcile delivery");
                                tokio::time::sleep(self.error_backoff).await;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(error = %err, "queue read failed");
                            tokio::time::sleep(self.error_backoff).await;
                        }
                    }
                }
            }
        }
        info!("queue reconciler stopped");
    }
}
