//! Per-connection session state machine.
//!
//! A connection starts unauthenticated, becomes active after one valid
//! authentication frame, and ends when the peer disconnects, a transport
//! error occurs, or authentication fails. Protocol mistakes in the active
//! state are answered with an error frame and never end the session.

use super::{
    SessionError, WorkerChannel,
    protocol::{AuthRequest, ErrorCode, ServerMessage, StatusMessage, TaskDelivery, WorkerCommand},
};
use crate::account::{
    domain::{Account, AccountId, ApiKey, Role},
    ports::AccountDirectory,
};
use crate::task::{
    domain::{TaskId, TaskRecord},
    ports::{TaskPublisher, TaskStore},
    services::{ClaimOutcome, CreateTaskRequest, DispatchError, TaskCoordinator},
};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// Default time allowed for the authentication frame.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity bound to an authenticated connection. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSession {
    account: Account,
    connection_id: Uuid,
}

impl WorkerSession {
    /// Binds `account` to a connection.
    #[must_use]
    pub const fn new(account: Account, connection_id: Uuid) -> Self {
        Self {
            account,
            connection_id,
        }
    }

    /// Authenticated account identifier.
    #[must_use]
    pub const fn worker_id(&self) -> AccountId {
        self.account.id()
    }

    /// Authenticated role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.account.role()
    }

    /// Connection handle used to correlate log events.
    #[must_use]
    pub const fn connection_id(&self) -> Uuid {
        self.connection_id
    }
}

/// How a session ended without a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The connection never authenticated.
    Rejected,
    /// The authenticated peer disconnected.
    Disconnected {
        /// Account that was connected.
        worker_id: AccountId,
        /// Tasks delivered on this connection and not yet closed by it.
        /// They stay assigned.
        held: Vec<TaskId>,
    },
}

/// Runs the session protocol over any [`WorkerChannel`].
pub struct SessionRunner<D, S, P, C>
where
    D: AccountDirectory + ?Sized,
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    directory: Arc<D>,
    coordinator: TaskCoordinator<S, P, C>,
    auth_timeout: Duration,
}

impl<D, S, P, C> SessionRunner<D, S, P, C>
where
    D: AccountDirectory + ?Sized,
    S: TaskStore + ?Sized,
    P: TaskPublisher + ?Sized,
    C: Clock + Send + Sync,
{
    /// Creates a runner with the default authentication timeout.
    #[must_use]
    pub const fn new(directory: Arc<D>, coordinator: TaskCoordinator<S, P, C>) -> Self {
        Self {
            directory,
            coordinator,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Overrides the authentication timeout.
    #[must_use]
    pub fn with_auth_timeout(mut self, auth_timeout: Duration) -> Self {
        self.auth_timeout = auth_timeout;
        self
    }

    /// Drives one connection to completion.
    ///
    /// If a claimed task cannot be pushed to the peer, its claim is released
    /// before the transport error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the transport fails.
    pub async fn run<W>(&self, channel: &mut W) -> Result<SessionEnd, SessionError>
    where
        W: WorkerChannel + ?Sized,
    {
        let connection_id = Uuid::new_v4();
        let span = info_span!("session", %connection_id);
        self.run_connection(channel, connection_id)
            .instrument(span)
            .await
    }

    async fn run_connection<W>(
        &self,
        channel: &mut W,
        connection_id: Uuid,
    ) -> Result<SessionEnd, SessionError>
    where
        W: WorkerChannel + ?Sized,
    {
        let Some(session) = self.authenticate(channel, connection_id).await? else {
            return Ok(SessionEnd::Rejected);
        };
        info!(
            worker_id = %session.worker_id(),
            role = session.role().as_str(),
            "session opened"
        );

        let mut held = BTreeSet::new();
        let served = self.serve(&session, channel, &mut held).await;
        let held_tasks: Vec<TaskId> = held.into_iter().collect();
        if held_tasks.is_empty() {
            info!(worker_id = %session.worker_id(), "session closed");
        } else {
            warn!(
                worker_id = %session.worker_id(),
                held_tasks = ?held_tasks,
                "session closed while holding assigned tasks"
            );
        }
        served.map(|()| SessionEnd::Disconnected {
            worker_id: session.worker_id(),
            held: held_tasks,
        })
    }

    async fn authenticate<W>(
        &self,
        channel: &mut W,
        connection_id: Uuid,
    ) -> Result<Option<WorkerSession>, SessionError>
    where
        W: WorkerChannel + ?Sized,
    {
        let received = match tokio::time::timeout(self.auth_timeout, channel.recv()).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                warn!("authentication timed out");
                send(
                    channel,
                    StatusMessage::error(ErrorCode::AuthTimeout, "Authentication timed out"),
                )
                .await?;
                return Ok(None);
            }
        };
        let Some(frame) = received else {
            debug!("peer left before authenticating");
            return Ok(None);
        };

        let Ok(request) = serde_json::from_str::<AuthRequest>(&frame) else {
            debug!("malformed authentication frame");
            send(
                channel,
                StatusMessage::error(ErrorCode::InvalidMessage, "Invalid JSON format"),
            )
            .await?;
            return Ok(None);
        };
        let Ok(api_key) = ApiKey::new(request.api_key) else {
            send(channel, invalid_api_key()).await?;
            return Ok(None);
        };

        match self.directory.find_by_api_key(&api_key).await {
            Ok(Some(account)) => {
                send(channel, StatusMessage::authenticated(&account)).await?;
                Ok(Some(WorkerSession::new(account, connection_id)))
            }
            Ok(None) => {
                warn!("rejected unknown api key");
                send(channel, invalid_api_key()).await?;
                Ok(None)
            }
            Err(err) => {
                error!(error = %err, "account lookup failed");
                send(
                    channel,
                    StatusMessage::error(
                        ErrorCode::ServerError,
                        "Server error during authentication",
                    ),
                )
                .await?;
                Ok(None)
            }
        }
    }

    async fn serve<W>(
        &self,
        session: &WorkerSession,
        channel: &mut W,
        held: &mut BTreeSet<TaskId>,
    ) -> Result<(), SessionError>
    where
        W: WorkerChannel + ?Sized,
    {
        while let Some(frame) = channel.recv().await? {
            let command = match serde_json::from_str::<WorkerCommand>(&frame) {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(error = %err, "malformed command frame");
                    send(
                        channel,
                        StatusMessage::error(
                            ErrorCode::InvalidMessage,
                            format!("Invalid message: {err}"),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            if !is_permitted(session.role(), &command) {
                debug!(command = command.name(), role = session.role().as_str(), "command denied");
                send(
                    channel,
                    StatusMessage::error(
                        ErrorCode::Forbidden,
                        format!("role {} may not run {}", session.role(), command.name()),
                    ),
                )
                .await?;
                continue;
            }

            let worker = session.worker_id();
            let reply = match command {
                WorkerCommand::GetTask => {
                    self.deliver_next(worker, channel, held).await?;
                    continue;
                }
                WorkerCommand::SubmitSolution { task_id, solution } => {
                    self.submit(worker, task_id, &solution, held).await
                }
                WorkerCommand::ReportFailure { task_id, reason } => {
                    self.report_failure(worker, task_id, &reason, held).await
                }
                WorkerCommand::CreateTask {
                    sitekey,
                    target_url,
                    captcha_type,
                } => {
                    let request = CreateTaskRequest::new(worker, sitekey, target_url)
                        .with_optional_kind(captcha_type);
                    match self.coordinator.create_task(request).await {
                        Ok(task) => StatusMessage::TaskCreated {
                            task: TaskRecord::from(&task),
                        },
                        Err(err) => error_reply(&err),
                    }
                }
                WorkerCommand::GetTasks => match self.coordinator.list_for_requester(worker).await {
                    Ok(tasks) => StatusMessage::TaskList {
                        tasks: tasks.iter().map(TaskRecord::from).collect(),
                    },
                    Err(err) => error_reply(&err),
                },
                WorkerCommand::GetQueueCount => match self.coordinator.queue_depth().await {
                    Ok(count) => StatusMessage::QueueCount { count },
                    Err(err) => error_reply(&err),
                },
                WorkerCommand::Unknown => {
                    debug!("unknown command");
                    StatusMessage::error(ErrorCode::UnknownCommand, "Unknown command")
                }
            };
            send(channel, reply).await?;
        }
        Ok(())
    }

    async fn deliver_next<W>(
        &self,
        worker: AccountId,
        channel: &mut W,
        held: &mut BTreeSet<TaskId>,
    ) -> Result<(), SessionError>
    where
        W: WorkerChannel + ?Sized,
    {
        let task = match self.coordinator.claim_next(worker).await {
            Ok(ClaimOutcome::Claimed(task)) => task,
            Ok(ClaimOutcome::NoTaskAvailable) => return send(channel, StatusMessage::NoTasks).await,
            Err(err) => return send(channel, error_reply(&err)).await,
        };

        let task_id = task.id();
        if let Err(err) = send(channel, TaskDelivery::from(&task)).await {
            warn!(task_id = %task_id, error = %err, "task delivery failed, releasing claim");
            if let Err(release_err) = self.coordinator.release_claim(task_id).await {
                error!(
                    task_id = %task_id,
                    error = %release_err,
                    "failed to release undelivered task"
                );
            }
            return Err(err);
        }
        held.insert(task_id);
        debug!(task_id = %task_id, "task delivered");
        Ok(())
    }

    async fn submit(
        &self,
        worker: AccountId,
        raw_task_id: i64,
        solution: &str,
        held: &mut BTreeSet<TaskId>,
    ) -> StatusMessage {
        let task_id = match TaskId::new(raw_task_id) {
            Ok(id) => id,
            Err(err) => return error_reply(&DispatchError::InvalidInput(err)),
        };
        match self.coordinator.submit(task_id, worker, solution).await {
            Ok(_) => {
                held.remove(&task_id);
                StatusMessage::SolutionSaved
            }
            Err(err) => error_reply(&err),
        }
    }

    async fn report_failure(
        &self,
        worker: AccountId,
        raw_task_id: i64,
        reason: &str,
        held: &mut BTreeSet<TaskId>,
    ) -> StatusMessage {
        let task_id = match TaskId::new(raw_task_id) {
            Ok(id) => id,
            Err(err) => return error_reply(&DispatchError::InvalidInput(err)),
        };
        match self.coordinator.report_failure(task_id, worker, reason).await {
            Ok(_) => {
                held.remove(&task_id);
                StatusMessage::FailureRecorded
            }
            Err(err) => error_reply(&err),
        }
    }
}

/// Capability check applied before any command reaches the coordinator.
const fn is_permitted(role: Role, command: &WorkerCommand) -> bool {
    match command {
        WorkerCommand::GetTask
        | WorkerCommand::SubmitSolution { .. }
        | WorkerCommand::ReportFailure { .. } => role.can_solve(),
        WorkerCommand::CreateTask { .. } => role.can_submit_tasks(),
        WorkerCommand::GetTasks | WorkerCommand::GetQueueCount | WorkerCommand::Unknown => true,
    }
}

fn invalid_api_key() -> StatusMessage {
    StatusMessage::error(ErrorCode::InvalidApiKey, "Invalid API key")
}

fn error_reply(err: &DispatchError) -> StatusMessage {
    match err {
        DispatchError::StoreUnavailable(_) => error!(error = %err, "task store failure"),
        DispatchError::QueuePublishFailure(_) => warn!(error = %err, "queue publish failure"),
        DispatchError::InvalidInput(_)
        | DispatchError::NotYourTask(_)
        | DispatchError::NotFound(_) => {
            debug!(error = %err, "request rejected");
        }
    }
    StatusMessage::from_dispatch_error(err)
}

async fn send<W>(channel: &mut W, message: impl Into<ServerMessage>) -> Result<(), SessionError>
where
    W: WorkerChannel + ?Sized,
{
    let frame = serde_json::to_string(&message.into())
        .map_err(|err| SessionError::Encode(err.to_string()))?;
    channel.send(frame).await
}
