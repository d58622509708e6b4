//! Wire protocol for the worker session channel.
//!
//! Every frame is one JSON object. Inbound frames are decoded once into a
//! closed set of variants; outbound frames are either a `status` message or
//! a bare task delivery.

use crate::account::domain::{Account, Role};
use crate::task::{
    domain::{CaptchaKind, Task, TaskRecord},
    services::DispatchError,
};
use serde::{Deserialize, Serialize};

/// First frame a connection must send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthRequest {
    /// API key identifying the caller.
    pub api_key: String,
}

/// Commands accepted from an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Claim the oldest pending task.
    GetTask,
    /// Close an assigned task with a solution.
    SubmitSolution {
        /// Task being solved.
        task_id: i64,
        /// Solution token.
        solution: String,
    },
    /// Close an assigned task as failed.
    ReportFailure {
        /// Task being abandoned.
        task_id: i64,
        /// Why the task could not be solved.
        reason: String,
    },
    /// Submit a new task.
    CreateTask {
        /// Site key.
        sitekey: String,
        /// Target URL.
        target_url: String,
        /// CAPTCHA kind; defaults to `hcaptcha`.
        #[serde(default)]
        captcha_type: Option<String>,
    },
    /// List the caller's own tasks.
    GetTasks,
    /// Count pending tasks.
    GetQueueCount,
    /// Any command name not listed above.
    #[serde(other)]
    Unknown,
}

impl WorkerCommand {
    /// Wire name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetTask => "get_task",
            Self::SubmitSolution { .. } => "submit_solution",
            Self::ReportFailure { .. } => "report_failure",
            Self::CreateTask { .. } => "create_task",
            Self::GetTasks => "get_tasks",
            Self::GetQueueCount => "get_queue_count",
            Self::Unknown => "unknown",
        }
    }
}

/// Machine-readable error codes carried by error frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The frame was not valid JSON or lacked required fields.
    InvalidMessage,
    /// The API key matched no account.
    InvalidApiKey,
    /// No authentication frame arrived in time.
    AuthTimeout,
    /// The caller's role may not run the command.
    Forbidden,
    /// The command name is not recognised.
    UnknownCommand,
    /// A field failed validation.
    InvalidInput,
    /// The task is not assigned to the caller.
    NotYourTask,
    /// The task does not exist for the caller.
    NotFound,
    /// The durable queue could not accept the task.
    QueueUnavailable,
    /// An internal failure; details are logged, not returned.
    ServerError,
}

/// Frames carrying a `status` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusMessage {
    /// Authentication succeeded.
    Ok {
        /// Account balance.
        balance: f64,
        /// Account username.
        username: String,
        /// Account role.
        role: Role,
    },
    /// A request failed.
    Error {
        /// Human-readable description.
        message: String,
        /// Machine-readable code.
        code: ErrorCode,
    },
    /// The queue had nothing to claim.
    NoTasks,
    /// The solution was recorded.
    SolutionSaved,
    /// The failure was recorded.
    FailureRecorded,
    /// A task was created.
    #[serde(rename = "success")]
    TaskCreated {
        /// The created task.
        task: TaskRecord,
    },
    /// The caller's tasks.
    #[serde(rename = "success")]
    TaskList {
        /// Tasks, oldest first.
        tasks: Vec<TaskRecord>,
    },
    /// Number of pending tasks.
    #[serde(rename = "success")]
    QueueCount {
        /// Pending task count.
        count: u64,
    },
}

impl StatusMessage {
    /// Builds an error frame.
    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }

    /// Builds the authentication success frame for `account`.
    #[must_use]
    pub fn authenticated(account: &Account) -> Self {
        Self::Ok {
            balance: account.balance(),
            username: account.username().to_owned(),
            role: account.role(),
        }
    }

    /// Maps a coordinator error to the frame shown to the caller.
    ///
    /// Store failures are reported generically; their detail belongs in the
    /// logs.
    #[must_use]
    pub fn from_dispatch_error(err: &DispatchError) -> Self {
        match err {
            DispatchError::InvalidInput(inner) => {
                Self::error(ErrorCode::InvalidInput, inner.to_string())
            }
            DispatchError::NotYourTask(_) => Self::error(ErrorCode::NotYourTask, err.to_string()),
            DispatchError::NotFound(_) => Self::error(ErrorCode::NotFound, err.to_string()),
            DispatchError::QueuePublishFailure(_) => {
                Self::error(ErrorCode::QueueUnavailable, "failed to queue task")
            }
            DispatchError::StoreUnavailable(_) => {
                Self::error(ErrorCode::ServerError, "internal server error")
            }
        }
    }
}

/// Frame pushing a claimed task to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDelivery {
    /// CAPTCHA kind.
    #[serde(rename = "type")]
    pub kind: CaptchaKind,
    /// Site key.
    pub sitekey: String,
    /// Target URL.
    pub url: String,
    /// Task identifier to quote back on submission.
    pub task_id: i64,
}

impl From<&Task> for TaskDelivery {
    fn from(task: &Task) -> Self {
        Self {
            kind: task.kind(),
            sitekey: task.site_key().as_str().to_owned(),
            url: task.target_url().as_str().to_owned(),
            task_id: task.id().value(),
        }
    }
}

/// Any outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// A `status` frame.
    Status(StatusMessage),
    /// A task delivery.
    Task(TaskDelivery),
}

impl From<StatusMessage> for ServerMessage {
    fn from(message: StatusMessage) -> Self {
        Self::Status(message)
    }
}

impl From<TaskDelivery> for ServerMessage {
    fn from(delivery: TaskDelivery) -> Self {
        Self::Task(delivery)
    }
}
