//! Client Submission Gate: persist, then publish.

use super::{DispatchError, DispatchResult};
use crate::account::domain::AccountId;
use crate::task::{
    domain::{CaptchaKind, NewTask, SiteKey, TargetUrl, Task, TaskRecord},
    ports::{TaskPublisher, TaskQueueError, TaskStore},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default deadline for publishing a created task.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Request payload for creating a task on behalf of a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    requester: AccountId,
    site_key: String,
    target_url: String,
    kind: Option<String>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields; the kind defaults to
    /// `hcaptcha`.
    #[must_use]
    pub fn new(
        requester: AccountId,
        site_key: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            requester,
            site_key: site_key.into(),
            target_url: target_url.into(),
            kind: None,
        }
    }

    /// Sets the CAPTCHA kind by its wire name.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the CAPTCHA kind when one was supplied.
    #[must_use]
    pub fn with_optional_kind(mut self, kind: Option<String>) -> Self {
        if kind.is_some() {
            self.kind = kind;
        }
        self
    }

    /// Submitting requester.
    #[must_use]
    pub const fn requester(&self) -> AccountId {
        self.requester
    }
}

/// Creates tasks and hands them to the durable queue.
pub struct SubmissionGate<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    publisher: Arc<P>,
    clock: Arc<C>,
    publish_timeout: Duration,
}

impl<S, P, C> Clone for SubmissionGate<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            clock: Arc::clone(&self.clock),
            publish_timeout: self.publish_timeout,
        }
    }
}

impl<S, P, C> SubmissionGate<S, P, C>
where
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a gate with the default publish timeout.
    #[must_use]
    pub const fn new(store: Arc<S>, publisher: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            store,
            publisher,
            clock,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Overrides the publish deadline.
    #[must_use]
    pub const fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.publish_timeout = publish_timeout;
        self
    }

    /// Validates the request, inserts a pending task, and publishes it.
    ///
    /// Validation happens before anything is written, so a rejected request
    /// leaves neither a row nor a queue message behind.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidInput`] for an empty site key or target URL,
    ///   or an unknown CAPTCHA kind.
    /// - [`DispatchError::StoreUnavailable`] when the insert fails.
    /// - [`DispatchError::QueuePublishFailure`] when publishing fails or
    ///   exceeds the deadline. The inserted row stays `pending`.
    pub async fn create_task(&self, request: CreateTaskRequest) -> DispatchResult<Task> {
        let CreateTaskRequest {
            requester,
            site_key,
            target_url,
            kind,
        } = request;
        let draft = NewTask::new(
            requester,
            CaptchaKind::from_optional(kind.as_deref()).map_err(DispatchError::InvalidInput)?,
            SiteKey::new(site_key).map_err(DispatchError::InvalidInput)?,
            TargetUrl::new(target_url).map_err(DispatchError::InvalidInput)?,
            &*self.clock,
        );

        let task = self.store.insert(&draft).await?;
        let record = TaskRecord::from(&task);

        match tokio::time::timeout(self.publish_timeout, self.publisher.publish(&record)).await {
            Ok(Ok(())) => {
                info!(
                    task_id = %task.id(),
                    requester_id = %requester,
                    kind = task.kind().as_str(),
                    "task created"
                );
                Ok(task)
            }
            Ok(Err(err)) => {
                warn!(task_id = %task.id(), error = %err, "task publish failed");
                Err(DispatchError::QueuePublishFailure(err))
            }
            Err(_elapsed) => {
                warn!(
                    task_id = %task.id(),
                    timeout_ms = self.publish_timeout.as_millis(),
                    "task publish timed out"
                );
                Err(DispatchError::QueuePublishFailure(TaskQueueError::Timeout(
                    self.publish_timeout,
                )))
            }
        }
    }
}
