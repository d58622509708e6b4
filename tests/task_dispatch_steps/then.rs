//! Then steps for task dispatch BDD scenarios.

use super::world::{DispatchWorld, SCENARIO_REQUESTER, account, run_async};
use captcha_dispatch::task::{
    domain::TaskStatus,
    services::{ClaimOutcome, DispatchError},
};
use eyre::WrapErr;
use rstest_bdd_macros::then;

fn assert_holds(world: &DispatchWorld, worker: i64, site_key: &str) -> Result<(), eyre::Report> {
    let Some(ClaimOutcome::Claimed(task)) = world.claims.get(&worker) else {
        return Err(eyre::eyre!("worker {worker} holds no task"));
    };
    eyre::ensure!(
        task.site_key().as_str() == site_key,
        "expected site key {site_key}, found {}",
        task.site_key()
    );
    eyre::ensure!(task.solver_id() == Some(account(worker)?));
    Ok(())
}

#[then(r#"worker {worker:i64} holds the task for site key "{site_key}""#)]
fn worker_holds(world: &DispatchWorld, worker: i64, site_key: String) -> Result<(), eyre::Report> {
    assert_holds(world, worker, &site_key)
}

#[then("worker {worker:i64} is told no task is available")]
fn worker_told_none(world: &DispatchWorld, worker: i64) -> Result<(), eyre::Report> {
    match world.claims.get(&worker) {
        Some(ClaimOutcome::NoTaskAvailable) => Ok(()),
        other => Err(eyre::eyre!("expected no task for worker {worker}, got {other:?}")),
    }
}

#[then("{count:u64} task is pending")]
fn single_task_pending(world: &DispatchWorld, count: u64) -> Result<(), eyre::Report> {
    tasks_pending(world, count)
}

#[then("{count:u64} tasks are pending")]
fn tasks_pending(world: &DispatchWorld, count: u64) -> Result<(), eyre::Report> {
    let pending = run_async(world.coordinator.queue_depth()).wrap_err("count pending tasks")?;
    eyre::ensure!(pending == count, "expected {count} pending, found {pending}");
    Ok(())
}

#[then(r#"the claimed task status is "{status}""#)]
fn claimed_task_status(world: &DispatchWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = run_async(
        world
            .coordinator
            .get_task(world.claimed_task()?, account(SCENARIO_REQUESTER)?),
    )
    .wrap_err("load claimed task")?;
    eyre::ensure!(
        task.status() == expected,
        "expected status {}, found {}",
        expected.as_str(),
        task.status().as_str()
    );
    Ok(())
}

#[then("the close is rejected as not assigned to the caller")]
fn close_rejected(world: &DispatchWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_close
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing close result"))?;
    if !matches!(result, Err(DispatchError::NotYourTask(_))) {
        return Err(eyre::eyre!("expected NotYourTask error, got {result:?}"));
    }
    Ok(())
}

#[then("the submission is rejected as invalid input")]
fn submission_rejected(world: &DispatchWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_submission
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing submission result"))?;
    if !matches!(result, Err(DispatchError::InvalidInput(_))) {
        return Err(eyre::eyre!("expected InvalidInput error, got {result:?}"));
    }
    Ok(())
}
