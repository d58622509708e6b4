//! Task aggregate root and related lifecycle types.

use super::{
    CaptchaKind, FailureReason, ParseTaskStatusError, SiteKey, SolutionToken, TargetUrl,
    TaskDomainError, TaskId,
};
use crate::account::domain::AccountId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a solver.
    #[default]
    Pending,
    /// Claimed by exactly one solver.
    Assigned,
    /// Closed with a solution token.
    Solved,
    /// Closed by the solver without a solution.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Solved => "solved",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "assigned" => Ok(Self::Assigned),
            "solved" => Ok(Self::Solved),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// A task accepted from a requester but not yet given an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    requester_id: AccountId,
    kind: CaptchaKind,
    site_key: SiteKey,
    target_url: TargetUrl,
    created_at: DateTime<Utc>,
}

impl NewTask {
    /// Creates a pending task draft stamped with the current clock time.
    #[must_use]
    pub fn new(
        requester_id: AccountId,
        kind: CaptchaKind,
        site_key: SiteKey,
        target_url: TargetUrl,
        clock: &impl Clock,
    ) -> Self {
        Self {
            requester_id,
            kind,
            site_key,
            target_url,
            created_at: clock.utc(),
        }
    }

    /// Returns the submitting requester.
    #[must_use]
    pub const fn requester_id(&self) -> AccountId {
        self.requester_id
    }

    /// Returns the CAPTCHA kind.
    #[must_use]
    pub const fn kind(&self) -> CaptchaKind {
        self.kind
    }

    /// Returns the site key.
    #[must_use]
    pub const fn site_key(&self) -> &SiteKey {
        &self.site_key
    }

    /// Returns the target URL.
    #[must_use]
    pub const fn target_url(&self) -> &TargetUrl {
        &self.target_url
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Binds the store-assigned identifier, producing a pending task.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            requester_id: self.requester_id,
            solver_id: None,
            kind: self.kind,
            site_key: self.site_key,
            target_url: self.target_url,
            solution_token: None,
            failure_reason: None,
            status: TaskStatus::Pending,
            attempts: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    requester_id: AccountId,
    solver_id: Option<AccountId>,
    kind: CaptchaKind,
    site_key: SiteKey,
    target_url: TargetUrl,
    solution_token: Option<SolutionToken>,
    failure_reason: Option<FailureReason>,
    status: TaskStatus,
    attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted or delivered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Submitting requester.
    pub requester_id: AccountId,
    /// Current or final solver, if any.
    pub solver_id: Option<AccountId>,
    /// CAPTCHA kind.
    pub kind: CaptchaKind,
    /// Site key.
    pub site_key: SiteKey,
    /// Target URL.
    pub target_url: TargetUrl,
    /// Solution token, once solved.
    pub solution_token: Option<SolutionToken>,
    /// Failure reason, once failed.
    pub failure_reason: Option<FailureReason>,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Number of successful claims.
    pub attempts: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Reconstructs a task, checking that its fields agree with its status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InconsistentState`] when a lifecycle
    /// invariant is violated, for example a solution token on a task that is
    /// not solved.
    pub fn from_persisted(data: PersistedTaskData) -> Result<Self, TaskDomainError> {
        check_invariants(&data)?;
        Ok(Self {
            id: data.id,
            requester_id: data.requester_id,
            solver_id: data.solver_id,
            kind: data.kind,
            site_key: data.site_key,
            target_url: data.target_url,
            solution_token: data.solution_token,
            failure_reason: data.failure_reason,
            status: data.status,
            attempts: data.attempts,
            created_at: data.created_at,
            updated_at: data.updated_at,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the submitting requester.
    #[must_use]
    pub const fn requester_id(&self) -> AccountId {
        self.requester_id
    }

    /// Returns the current or final solver.
    #[must_use]
    pub const fn solver_id(&self) -> Option<AccountId> {
        self.solver_id
    }

    /// Returns the CAPTCHA kind.
    #[must_use]
    pub const fn kind(&self) -> CaptchaKind {
        self.kind
    }

    /// Returns the site key.
    #[must_use]
    pub const fn site_key(&self) -> &SiteKey {
        &self.site_key
    }

    /// Returns the target URL.
    #[must_use]
    pub const fn target_url(&self) -> &TargetUrl {
        &self.target_url
    }

    /// Returns the solution token, once solved.
    #[must_use]
    pub const fn solution_token(&self) -> Option<&SolutionToken> {
        self.solution_token.as_ref()
    }

    /// Returns the failure reason, once failed.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns how many times the task has been claimed.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the task can be handed to a solver.
    #[must_use]
    pub const fn is_claimable(&self) -> bool {
        self.solver_id.is_none() && matches!(self.status, TaskStatus::Pending)
    }

    /// Binds the task to `worker`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AlreadyClaimed`] unless the task is pending
    /// with no solver.
    pub fn claim(&mut self, worker: AccountId, at: DateTime<Utc>) -> Result<(), TaskDomainError> {
        if !self.is_claimable() {
            return Err(TaskDomainError::AlreadyClaimed(self.id));
        }
        self.solver_id = Some(worker);
        self.status = TaskStatus::Assigned;
        self.attempts = self.attempts.saturating_add(1);
        self.updated_at = at;
        Ok(())
    }

    /// Returns an assigned task to the pending pool.
    ///
    /// Pending tasks are left untouched and closed tasks are never reopened.
    /// Returns whether anything changed.
    pub fn release(&mut self, at: DateTime<Utc>) -> bool {
        if !matches!(self.status, TaskStatus::Assigned) {
            return false;
        }
        self.solver_id = None;
        self.status = TaskStatus::Pending;
        self.updated_at = at;
        true
    }

    /// Closes the task with `token` on behalf of its assigned solver.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssignedTo`] unless the task is
    /// currently assigned to `worker`.
    pub fn record_solution(
        &mut self,
        worker: AccountId,
        token: SolutionToken,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.ensure_assigned_to(worker)?;
        self.solution_token = Some(token);
        self.status = TaskStatus::Solved;
        self.updated_at = at;
        Ok(())
    }

    /// Closes the task as failed on behalf of its assigned solver.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotAssignedTo`] unless the task is
    /// currently assigned to `worker`.
    pub fn record_failure(
        &mut self,
        worker: AccountId,
        reason: FailureReason,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.ensure_assigned_to(worker)?;
        self.failure_reason = Some(reason);
        self.status = TaskStatus::Failed;
        self.updated_at = at;
        Ok(())
    }

    /// Returns the task with its creation time replaced by `created_at`.
    ///
    /// Used when a redelivered record overwrites an existing row, so that
    /// claim ordering stays anchored to the original creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Merges a redelivered snapshot over the stored row `stored`.
    ///
    /// Only a row that is still pending with no solver may be overwritten;
    /// once claimed, the store's own transitions own the row and the
    /// snapshot is discarded. The merged task keeps the stored `created_at`
    /// and never lowers `attempts`. Timestamps are not compared, so clock
    /// skew between coordinators cannot reopen a claim.
    #[must_use]
    pub fn reconciled_over(self, stored: &Self) -> Option<Self> {
        if !stored.is_claimable() {
            return None;
        }
        let attempts = self.attempts.max(stored.attempts);
        let mut merged = self.with_created_at(stored.created_at);
        merged.attempts = attempts;
        Some(merged)
    }

    fn ensure_assigned_to(&self, worker: AccountId) -> Result<(), TaskDomainError> {
        let assigned = matches!(self.status, TaskStatus::Assigned)
            && self.solver_id == Some(worker)
            && self.solution_token.is_none();
        if assigned {
            Ok(())
        } else {
            Err(TaskDomainError::NotAssignedTo {
                task: self.id,
                worker,
            })
        }
    }
}

fn check_invariants(data: &PersistedTaskData) -> Result<(), TaskDomainError> {
    let inconsistent = |reason| TaskDomainError::InconsistentState {
        task: data.id,
        reason,
    };
    let has_solver = data.solver_id.is_some();
    let has_solution = data.solution_token.is_some();

    match data.status {
        TaskStatus::Pending if has_solver => Err(inconsistent("pending task has a solver")),
        TaskStatus::Pending | TaskStatus::Assigned | TaskStatus::Failed if has_solution => {
            Err(inconsistent("solution token on a task that is not solved"))
        }
        TaskStatus::Assigned if !has_solver => Err(inconsistent("assigned task has no solver")),
        TaskStatus::Solved if !has_solution => Err(inconsistent("solved task has no solution")),
        _ => Ok(()),
    }
}
