//! Serialisable task record used on the durable queue and in API responses.

use super::{
    CaptchaKind, FailureReason, PersistedTaskData, SiteKey, SolutionToken, TargetUrl, Task,
    TaskDomainError, TaskId, TaskStatus,
};
use crate::account::domain::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat, wire-stable snapshot of a task.
///
/// Queue deliveries are untrusted: a record only becomes a [`Task`] through
/// [`TaskRecord::into_task`], which re-validates every field and the
/// lifecycle invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier.
    pub id: i64,
    /// Submitting requester.
    pub user_id: i64,
    /// Current or final solver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver_id: Option<i64>,
    /// CAPTCHA kind.
    #[serde(default)]
    pub captcha_type: CaptchaKind,
    /// Site key.
    pub sitekey: String,
    /// Target URL.
    pub target_url: String,
    /// Solution token, once solved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_response: Option<String>,
    /// Failure reason, once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Number of successful claims.
    #[serde(default)]
    pub attempts: u32,
    /// Creation timestamp; absent on records from older producers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Latest mutation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Validates the record and converts it into a task.
    ///
    /// Missing timestamps default to `received_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when any field is invalid or the record
    /// violates a lifecycle invariant.
    pub fn into_task(self, received_at: DateTime<Utc>) -> Result<Task, TaskDomainError> {
        let created_at = self.created_at.unwrap_or(received_at);
        let data = PersistedTaskData {
            id: TaskId::new(self.id)?,
            requester_id: AccountId::new(self.user_id)?,
            solver_id: self.solver_id.map(AccountId::new).transpose()?,
            kind: self.captcha_type,
            site_key: SiteKey::new(self.sitekey)?,
            target_url: TargetUrl::new(self.target_url)?,
            solution_token: self
                .captcha_response
                .filter(|token| !token.trim().is_empty())
                .map(SolutionToken::new)
                .transpose()?,
            failure_reason: self
                .error_message
                .filter(|reason| !reason.trim().is_empty())
                .map(FailureReason::new)
                .transpose()?,
            status: self.status,
            attempts: self.attempts,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        };
        Task::from_persisted(data)
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().value(),
            user_id: task.requester_id().value(),
            solver_id: task.solver_id().map(AccountId::value),
            captcha_type: task.kind(),
            sitekey: task.site_key().as_str().to_owned(),
            target_url: task.target_url().as_str().to_owned(),
            captcha_response: task.solution_token().map(|token| token.as_str().to_owned()),
            error_message: task.failure_reason().map(|reason| reason.as_str().to_owned()),
            status: task.status(),
            attempts: task.attempts(),
            created_at: Some(task.created_at()),
            updated_at: Some(task.updated_at()),
        }
    }
}
