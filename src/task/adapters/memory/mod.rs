//! In-memory adapters for tests and single-process deployments.

mod queue;
mod task;

pub use queue::InMemoryTaskQueue;
pub use task::InMemoryTaskStore;
