//! Scripted channel and runner fixtures for session tests.

use crate::account::{
    adapters::memory::InMemoryAccountDirectory,
    domain::{Account, AccountId, ApiKey, Role},
};
use crate::session::{SessionError, SessionRunner, WorkerChannel};
use crate::task::{
    adapters::memory::{InMemoryTaskQueue, InMemoryTaskStore},
    services::TaskCoordinator,
};
use async_trait::async_trait;
use mockable::DefaultClock;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub(super) const WORKER_KEY: &str = "worker-key";
pub(super) const CLIENT_KEY: &str = "client-key";
pub(super) const ADMIN_KEY: &str = "admin-key";
pub(super) const WORKER_ID: i64 = 20;
pub(super) const CLIENT_ID: i64 = 1;

pub(super) type TestRunner =
    SessionRunner<InMemoryAccountDirectory, InMemoryTaskStore, InMemoryTaskQueue, DefaultClock>;

/// Runner wired to in-memory adapters, with handles to inspect them.
pub(super) struct Harness {
    pub(super) store: Arc<InMemoryTaskStore>,
    pub(super) runner: TestRunner,
}

impl Harness {
    pub(super) fn new() -> Self {
        let directory = InMemoryAccountDirectory::new();
        for (key, id, name, role) in [
            (WORKER_KEY, WORKER_ID, "solver", Role::Worker),
            (CLIENT_KEY, CLIENT_ID, "requester", Role::Client),
            (ADMIN_KEY, 30, "operator", Role::Admin),
        ] {
            let account = Account::new(
                AccountId::new(id).expect("fixture ids are positive"),
                name,
                role,
                10.0,
            )
            .expect("fixture usernames are non-empty");
            directory
                .register(ApiKey::new(key).expect("fixture keys are non-empty"), account)
                .expect("fresh directory lock is healthy");
        }

        let store = Arc::new(InMemoryTaskStore::new());
        let coordinator = TaskCoordinator::new(
            Arc::clone(&store),
            Arc::new(InMemoryTaskQueue::new(Duration::from_millis(10))),
            Arc::new(DefaultClock),
        );
        let runner = SessionRunner::new(Arc::new(directory), coordinator)
            .with_auth_timeout(Duration::from_millis(50));
        Self { store, runner }
    }
}

/// One scripted inbound step.
pub(super) enum Inbound {
    Frame(String),
    /// Never yields a frame.
    Silence,
}

/// Channel replaying a fixed script and recording everything sent.
pub(super) struct ScriptedChannel {
    inbound: VecDeque<Inbound>,
    pub(super) sent: Vec<Value>,
    fail_deliveries: bool,
}

impl ScriptedChannel {
    pub(super) fn new<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            inbound: frames
                .into_iter()
                .map(|frame| Inbound::Frame(frame.to_string()))
                .collect(),
            sent: Vec::new(),
            fail_deliveries: false,
        }
    }

    pub(super) fn raw(frames: &[&str]) -> Self {
        Self {
            inbound: frames
                .iter()
                .map(|frame| Inbound::Frame((*frame).to_owned()))
                .collect(),
            sent: Vec::new(),
            fail_deliveries: false,
        }
    }

    pub(super) fn silent() -> Self {
        Self {
            inbound: VecDeque::from([Inbound::Silence]),
            sent: Vec::new(),
            fail_deliveries: false,
        }
    }

    /// Makes every task delivery frame fail to send.
    pub(super) fn failing_deliveries(mut self) -> Self {
        self.fail_deliveries = true;
        self
    }
}

#[async_trait]
impl WorkerChannel for ScriptedChannel {
    async fn recv(&mut self) -> Result<Option<String>, SessionError> {
        match self.inbound.pop_front() {
            Some(Inbound::Frame(frame)) => Ok(Some(frame)),
            Some(Inbound::Silence) => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn send(&mut self, frame: String) -> Result<(), SessionError> {
        let value: Value = serde_json::from_str(&frame).map_err(SessionError::transport)?;
        if self.fail_deliveries && value.get("task_id").is_some() && value.get("status").is_none() {
            return Err(SessionError::transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer went away",
            )));
        }
        self.sent.push(value);
        Ok(())
    }
}
