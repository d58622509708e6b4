//! Domain model for CAPTCHA task dispatch.
//!
//! A task moves `pending → assigned → solved | failed`, and may fall back from
//! `assigned` to `pending` when a claim is released. The transition guards
//! live on [`Task`] so that in-process adapters enforce exactly the same
//! predicates that the `PostgreSQL` adapter expresses as conditional updates.

mod error;
mod ids;
mod kind;
mod payload;
mod record;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::TaskId;
pub use kind::CaptchaKind;
pub use payload::{FailureReason, SiteKey, SolutionToken, TargetUrl};
pub use record::TaskRecord;
pub use task::{NewTask, PersistedTaskData, Task, TaskStatus};
