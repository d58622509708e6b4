//! In-memory integration tests for concurrent worker sessions.

use super::helpers::{Deployment, account, deployment, request};
use async_trait::async_trait;
use captcha_dispatch::account::{
    adapters::memory::InMemoryAccountDirectory,
    domain::{Account, ApiKey, Role},
};
use captcha_dispatch::session::{SessionEnd, SessionError, SessionRunner, WorkerChannel};
use captcha_dispatch::task::domain::TaskStatus;
use rstest::rstest;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;

/// Channel that replays queued frames and records replies.
struct ReplayChannel {
    inbound: VecDeque<String>,
    replies: Vec<Value>,
}

impl ReplayChannel {
    fn new(frames: impl IntoIterator<Item = Value>) -> Self {
        Self {
            inbound: frames.into_iter().map(|frame| frame.to_string()).collect(),
            replies: Vec::new(),
        }
    }

    fn deliveries(&self) -> Vec<i64> {
        self.replies
            .iter()
            .filter(|reply| reply.get("status").is_none())
            .filter_map(|reply| reply.get("task_id").and_then(Value::as_i64))
            .collect()
    }
}

#[async_trait]
impl WorkerChannel for ReplayChannel {
    async fn recv(&mut self) -> Result<Option<String>, SessionError> {
        tokio::task::yield_now().await;
        Ok(self.inbound.pop_front())
    }

    async fn send(&mut self, frame: String) -> Result<(), SessionError> {
        let reply = serde_json::from_str(&frame).map_err(SessionError::transport)?;
        self.replies.push(reply);
        Ok(())
    }
}

fn directory() -> InMemoryAccountDirectory {
    let directory = InMemoryAccountDirectory::new();
    for (key, id, name) in [("alpha-key", 20, "alpha"), ("beta-key", 21, "beta")] {
        let solver = Account::new(account(id), name, Role::Worker, 0.0).expect("named account");
        directory
            .register(ApiKey::new(key).expect("non-empty key"), solver)
            .expect("fresh directory");
    }
    directory
}

fn script(key: &str, claims: usize) -> ReplayChannel {
    let mut frames = vec![json!({ "api_key": key })];
    frames.extend(std::iter::repeat_n(json!({ "command": "get_task" }), claims));
    ReplayChannel::new(frames)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parallel_sessions_split_the_queue(deployment: Deployment) -> eyre::Result<()> {
    for index in 0..10 {
        deployment
            .coordinator
            .create_task(request(1, &format!("site-{index}")))
            .await?;
    }
    let runner = SessionRunner::new(Arc::new(directory()), deployment.coordinator.clone());
    let mut alpha = script("alpha-key", 8);
    let mut beta = script("beta-key", 8);

    let (alpha_end, beta_end) = tokio::join!(runner.run(&mut alpha), runner.run(&mut beta));

    let mut delivered = alpha.deliveries();
    delivered.extend(beta.deliveries());
    delivered.sort_unstable();
    assert_eq!(delivered, (1..=10).collect::<Vec<i64>>());

    let SessionEnd::Disconnected { held: alpha_held, .. } = alpha_end? else {
        eyre::bail!("alpha authenticated");
    };
    let SessionEnd::Disconnected { held: beta_held, .. } = beta_end? else {
        eyre::bail!("beta authenticated");
    };
    assert_eq!(alpha_held.len() + beta_held.len(), 10);

    let no_tasks = alpha
        .replies
        .iter()
        .chain(beta.replies.iter())
        .filter(|reply| reply.get("status") == Some(&json!("no_tasks")))
        .count();
    assert_eq!(no_tasks, 6);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn worker_cannot_close_another_workers_task(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(1, "k")).await?;
    let runner = SessionRunner::new(Arc::new(directory()), deployment.coordinator.clone());
    let mut alpha = script("alpha-key", 1);
    runner.run(&mut alpha).await?;
    let mut beta = ReplayChannel::new([
        json!({ "api_key": "beta-key" }),
        json!({
            "command": "submit_solution",
            "task_id": created.id().value(),
            "solution": "stolen",
        }),
    ]);

    runner.run(&mut beta).await?;

    assert_eq!(
        beta.replies.last().and_then(|reply| reply.get("code")),
        Some(&json!("not_your_task"))
    );
    let task = deployment.coordinator.get_task(created.id(), account(1)).await?;
    assert_eq!(task.status(), TaskStatus::Assigned);
    assert_eq!(task.solver_id(), Some(account(20)));
    Ok(())
}
