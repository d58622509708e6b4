//! Application services for task dispatch.
//!
//! Each service receives its ports explicitly at construction; none of them
//! reaches for process-wide handles.

mod assignment;
mod coordinator;
mod error;
mod queries;
mod reconciler;
mod submission;

pub use assignment::{AssignmentEngine, ClaimOutcome};
pub use coordinator::{DynTaskCoordinator, TaskCoordinator};
pub use error::{DispatchError, DispatchResult};
pub use queries::TaskQueries;
pub use reconciler::{DEFAULT_ERROR_BACKOFF, QueueReconciler, ReconcileOutcome};
pub use submission::{CreateTaskRequest, DEFAULT_PUBLISH_TIMEOUT, SubmissionGate};
