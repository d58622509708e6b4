//! In-memory integration tests for queue reconciliation.

use super::helpers::{Deployment, account, deployment, request};
use captcha_dispatch::task::{
    domain::{TaskRecord, TaskStatus},
    ports::{TaskConsumer, TaskPublisher, TaskQueueError, TaskStore},
    services::{ClaimOutcome, DispatchError, ReconcileOutcome},
};
use chrono::{Duration as ChronoDuration, Utc};
use eyre::{OptionExt, bail, ensure};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_task_round_trips_through_queue(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(1, "k")).await?;

    let payload = deployment
        .queue
        .next_delivery()
        .await?
        .ok_or_else(|| eyre::eyre!("publish should enqueue one delivery"))?;
    let outcome = deployment.reconciler().reconcile(&payload).await?;

    assert_eq!(outcome, ReconcileOutcome::Applied(created.id()));
    assert_eq!(deployment.store.find_by_id(created.id()).await?, Some(created));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redelivery_after_solve_is_ignored(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(1, "k")).await?;
    deployment.coordinator.claim_next(account(20)).await?;
    deployment.coordinator.submit(created.id(), account(20), "token").await?;
    let payload = serde_json::to_vec(&TaskRecord::from(&created))?;

    let outcome = deployment.reconciler().reconcile(&payload).await?;

    assert_eq!(outcome, ReconcileOutcome::Stale(created.id()));
    let stored = deployment.coordinator.get_task(created.id(), account(1)).await?;
    assert_eq!(stored.status(), TaskStatus::Solved);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn record_from_another_producer_becomes_claimable(
    deployment: Deployment,
) -> eyre::Result<()> {
    let legacy = br#"{"id":7,"user_id":3,"sitekey":"k","target_url":"u","status":"pending"}"#;
    deployment.queue.publish_raw(legacy.to_vec())?;

    deployment
        .reconciler()
        .run(tokio::time::sleep(Duration::from_millis(100)))
        .await;

    let ClaimOutcome::Claimed(task) = deployment.coordinator.claim_next(account(20)).await? else {
        eyre::bail!("reconciled record should be claimable");
    };
    assert_eq!(task.id().value(), 7);
    assert_eq!(task.kind().as_str(), "hcaptcha");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn publish_failure_does_not_lose_task(deployment: Deployment) -> eyre::Result<()> {
    deployment.queue.set_unavailable(true);

    let result = deployment.coordinator.create_task(request(1, "k")).await;

    assert!(matches!(
        result,
        Err(DispatchError::QueuePublishFailure(TaskQueueError::Unavailable(_)))
    ));
    let ClaimOutcome::Claimed(task) = deployment.coordinator.claim_next(account(20)).await? else {
        eyre::bail!("the inserted row stays pending after a publish failure");
    };
    assert_eq!(task.site_key().as_str(), "k");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_deliveries_converge(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(1, "k")).await?;
    let record = TaskRecord::from(&created);
    deployment.queue.publish(&record).await?;
    deployment.queue.publish(&record).await?;

    deployment
        .reconciler()
        .run(tokio::time::sleep(Duration::from_millis(100)))
        .await;

    assert_eq!(deployment.coordinator.list_for_requester(account(1)).await?, vec![created]);
    assert_eq!(deployment.coordinator.queue_depth().await?, 1);
    Ok(())
}

#[rstest]
#[case::same_instant(0)]
#[case::creator_clock_ahead(2)]
#[case::creator_clock_behind(-2)]
#[tokio::test(flavor = "multi_thread")]
async fn late_creation_delivery_never_reopens_claim(
    deployment: Deployment,
    #[case] creator_skew_secs: i64,
) -> eyre::Result<()> {
    let now = Utc::now();
    let creator = deployment.coordinator_at(now + ChronoDuration::seconds(creator_skew_secs));
    let claimer = deployment.coordinator_at(now);
    let created = creator.create_task(request(1, "k")).await?;
    let ClaimOutcome::Claimed(held) = claimer.claim_next(account(10)).await? else {
        bail!("first worker should claim the new task");
    };

    let payload = deployment
        .queue
        .next_delivery()
        .await?
        .ok_or_eyre("create should enqueue one delivery")?;
    let outcome = deployment.reconciler().reconcile(&payload).await?;
    let rival = claimer.claim_next(account(20)).await?;

    ensure!(outcome == ReconcileOutcome::Stale(created.id()), "got {outcome:?}");
    ensure!(rival == ClaimOutcome::NoTaskAvailable, "second worker got {rival:?}");
    let stored = deployment.store.find_by_id(held.id()).await?.ok_or_eyre("task exists")?;
    ensure!(stored.solver_id() == Some(account(10)));
    ensure!(stored.attempts() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn undated_redelivery_never_reopens_claim(deployment: Deployment) -> eyre::Result<()> {
    let legacy = br#"{"id":7,"user_id":3,"sitekey":"k","target_url":"u","status":"pending"}"#;
    let reconciler = deployment.reconciler();
    reconciler.reconcile(legacy).await?;
    let ClaimOutcome::Claimed(held) = deployment.coordinator.claim_next(account(10)).await? else {
        bail!("reconciled record should be claimable");
    };

    let outcome = reconciler.reconcile(legacy).await?;

    ensure!(outcome == ReconcileOutcome::Stale(held.id()), "got {outcome:?}");
    let rival = deployment.coordinator.claim_next(account(20)).await?;
    ensure!(rival == ClaimOutcome::NoTaskAvailable, "second worker got {rival:?}");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redelivery_after_release_keeps_attempt_count(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(1, "k")).await?;
    deployment.coordinator.claim_next(account(10)).await?;
    deployment.coordinator.release_claim(created.id()).await?;
    let payload = serde_json::to_vec(&TaskRecord::from(&created))?;

    let outcome = deployment.reconciler().reconcile(&payload).await?;

    ensure!(outcome == ReconcileOutcome::Applied(created.id()));
    let stored = deployment.store.find_by_id(created.id()).await?.ok_or_eyre("task exists")?;
    ensure!(stored.is_claimable());
    ensure!(stored.attempts() == 1);
    Ok(())
}
