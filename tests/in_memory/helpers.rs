//! Shared test helpers for in-memory integration tests.

use captcha_dispatch::account::domain::AccountId;
use captcha_dispatch::task::{
    adapters::memory::{InMemoryTaskQueue, InMemoryTaskStore},
    services::{CreateTaskRequest, QueueReconciler, TaskCoordinator},
};
use chrono::{DateTime, Local, Utc};
use mockable::{Clock, DefaultClock};
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;

/// Coordinator wired to in-memory adapters.
pub type TestCoordinator = TaskCoordinator<InMemoryTaskStore, InMemoryTaskQueue, DefaultClock>;

/// Reconciler draining the in-memory queue into the in-memory store.
pub type TestReconciler = QueueReconciler<InMemoryTaskStore, InMemoryTaskQueue, DefaultClock>;

/// Clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Coordinator whose clock never advances.
pub type FrozenCoordinator = TaskCoordinator<InMemoryTaskStore, InMemoryTaskQueue, FixedClock>;

/// One dispatch deployment: shared store, queue, and coordinator.
pub struct Deployment {
    pub store: Arc<InMemoryTaskStore>,
    pub queue: Arc<InMemoryTaskQueue>,
    pub coordinator: TestCoordinator,
}

impl Deployment {
    /// Builds a reconciler over this deployment's store and queue.
    #[must_use]
    pub fn reconciler(&self) -> TestReconciler {
        QueueReconciler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            Arc::new(DefaultClock),
        )
    }

    /// Builds another coordinator over the same store and queue whose clock
    /// is frozen at `now`, standing in for a second process.
    #[must_use]
    pub fn coordinator_at(&self, now: DateTime<Utc>) -> FrozenCoordinator {
        TaskCoordinator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            Arc::new(FixedClock(now)),
        )
    }
}

/// Provides a fresh deployment for each test.
#[fixture]
pub fn deployment() -> Deployment {
    let store = Arc::new(InMemoryTaskStore::new());
    let queue = Arc::new(InMemoryTaskQueue::new(Duration::from_millis(10)));
    let coordinator = TaskCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&queue),
        Arc::new(DefaultClock),
    );
    Deployment {
        store,
        queue,
        coordinator,
    }
}

/// Account identifier from a fixture constant.
///
/// # Panics
///
/// Panics if `id` is not positive.
#[must_use]
pub fn account(id: i64) -> AccountId {
    AccountId::new(id).expect("fixture account ids are positive")
}

/// Minimal hCaptcha request from `requester`.
#[must_use]
pub fn request(requester: i64, site_key: &str) -> CreateTaskRequest {
    CreateTaskRequest::new(account(requester), site_key, "https://example.com/login")
}
