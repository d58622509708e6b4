//! Shared world state for task dispatch BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use captcha_dispatch::account::domain::AccountId;
use captcha_dispatch::task::{
    adapters::memory::{InMemoryTaskQueue, InMemoryTaskStore},
    domain::{Task, TaskId},
    services::{ClaimOutcome, DispatchError, TaskCoordinator},
};
use mockable::DefaultClock;
use rstest::fixture;

/// Coordinator type used by the BDD world.
pub type TestCoordinator = TaskCoordinator<InMemoryTaskStore, InMemoryTaskQueue, DefaultClock>;

/// Requester used for tasks created in `Given` steps.
pub const SCENARIO_REQUESTER: i64 = 1;

/// Scenario world for task dispatch behaviour tests.
pub struct DispatchWorld {
    pub coordinator: TestCoordinator,
    pub claims: HashMap<i64, ClaimOutcome>,
    pub claimed_task: Option<TaskId>,
    pub last_close: Option<Result<Task, DispatchError>>,
    pub last_submission: Option<Result<Task, DispatchError>>,
}

impl DispatchWorld {
    /// Creates a world over an empty in-memory deployment.
    #[must_use]
    pub fn new() -> Self {
        let coordinator = TaskCoordinator::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryTaskQueue::default()),
            Arc::new(DefaultClock),
        );

        Self {
            coordinator,
            claims: HashMap::new(),
            claimed_task: None,
            last_close: None,
            last_submission: None,
        }
    }

    /// Identifier of the most recently claimed task.
    ///
    /// # Errors
    ///
    /// Returns an error if no step has claimed a task yet.
    pub fn claimed_task(&self) -> Result<TaskId, eyre::Report> {
        self.claimed_task
            .ok_or_else(|| eyre::eyre!("missing claimed task in scenario world"))
    }
}

impl Default for DispatchWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DispatchWorld {
    DispatchWorld::default()
}

/// Parses a scenario account number.
///
/// # Errors
///
/// Returns an error if `id` is not positive.
pub fn account(id: i64) -> Result<AccountId, eyre::Report> {
    AccountId::new(id).map_err(|err| eyre::eyre!("invalid account in scenario: {err}"))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
