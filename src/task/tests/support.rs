//! Shared fixtures for task unit tests.

use crate::account::domain::AccountId;
use crate::task::domain::{CaptchaKind, NewTask, SiteKey, TargetUrl, Task, TaskDomainError, TaskId};
use chrono::{DateTime, Duration, Utc};
use mockable::DefaultClock;

pub(super) fn account(id: i64) -> AccountId {
    AccountId::new(id).expect("test account ids are positive")
}

pub(super) fn draft(requester: i64, site_key: &str) -> Result<NewTask, TaskDomainError> {
    Ok(NewTask::new(
        account(requester),
        CaptchaKind::default(),
        SiteKey::new(site_key)?,
        TargetUrl::new("https://example.com")?,
        &DefaultClock,
    ))
}

pub(super) fn pending_task(id: i64, requester: i64) -> Task {
    draft(requester, "sitekey")
        .expect("draft fields are valid")
        .into_task(TaskId::new(id).expect("test task ids are positive"))
}

pub(super) fn later(task: &Task, seconds: i64) -> DateTime<Utc> {
    task.updated_at() + Duration::seconds(seconds)
}
