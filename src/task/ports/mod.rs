//! Port contracts for task dispatch.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.
//! Every mutating store operation other than
//! [`TaskStore::release_claim`] is a conditional update evaluated atomically
//! by the store; the services never read-then-write.

pub mod queue;
pub mod store;

pub use queue::{TaskConsumer, TaskPublisher, TaskQueueError, TaskQueueResult};
pub use store::{TaskStore, TaskStoreError, TaskStoreResult};
