//! When steps for task dispatch BDD scenarios.

use super::world::{DispatchWorld, account, run_async};
use captcha_dispatch::task::services::{ClaimOutcome, CreateTaskRequest};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("worker {worker:i64} asks for a task")]
fn worker_asks(world: &mut DispatchWorld, worker: i64) -> Result<(), eyre::Report> {
    let outcome = run_async(world.coordinator.claim_next(account(worker)?))
        .wrap_err("claim next task")?;
    if let ClaimOutcome::Claimed(ref task) = outcome {
        world.claimed_task = Some(task.id());
    }
    world.claims.insert(worker, outcome);
    Ok(())
}

#[when(r#"worker {worker:i64} submits solution "{solution}" for the claimed task"#)]
fn worker_submits(
    world: &mut DispatchWorld,
    worker: i64,
    solution: String,
) -> Result<(), eyre::Report> {
    let task_id = world.claimed_task()?;
    let result = run_async(world.coordinator.submit(task_id, account(worker)?, &solution));
    world.last_close = Some(result);
    Ok(())
}

#[when("the claim on the claimed task is released")]
fn claim_released(world: &mut DispatchWorld) -> Result<(), eyre::Report> {
    let task_id = world.claimed_task()?;
    run_async(world.coordinator.release_claim(task_id)).wrap_err("release claim")?;
    Ok(())
}

#[when(r#"requester {requester:i64} submits a task for site key "{site_key}""#)]
fn requester_submits(
    world: &mut DispatchWorld,
    requester: i64,
    site_key: String,
) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(account(requester)?, site_key, "https://example.com");
    world.last_submission = Some(run_async(world.coordinator.create_task(request)));
    Ok(())
}
