//! Error types for task domain validation and parsing.

use super::TaskId;
use crate::account::domain::{AccountDomainError, AccountId};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// Task identifiers are store-assigned and always positive.
    #[error("invalid task identifier {0}, expected a positive integer")]
    InvalidTaskId(i64),

    /// The site key is empty after trimming.
    #[error("sitekey must not be empty")]
    EmptySiteKey,

    /// The target URL is empty after trimming.
    #[error("target url must not be empty")]
    EmptyTargetUrl,

    /// The solution token is empty after trimming.
    #[error("solution must not be empty")]
    EmptySolutionToken,

    /// The failure reason is empty after trimming.
    #[error("failure reason must not be empty")]
    EmptyFailureReason,

    /// The CAPTCHA type is not one the dispatcher knows how to route.
    #[error("unsupported captcha type: {0}")]
    UnsupportedCaptchaKind(String),

    /// A requester or solver identifier failed validation.
    #[error(transparent)]
    Account(#[from] AccountDomainError),

    /// The task is no longer pending and unclaimed.
    #[error("task {0} is not available for claiming")]
    AlreadyClaimed(TaskId),

    /// The task is not currently assigned to the given worker.
    #[error("task {task} is not assigned to worker {worker}")]
    NotAssignedTo {
        /// Task being closed.
        task: TaskId,
        /// Worker attempting the close.
        worker: AccountId,
    },

    /// Persisted or delivered fields contradict the lifecycle invariants.
    #[error("task {task} has inconsistent state: {reason}")]
    InconsistentState {
        /// Offending task.
        task: TaskId,
        /// Violated invariant.
        reason: &'static str,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
