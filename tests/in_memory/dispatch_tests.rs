//! In-memory integration tests for claiming and closing tasks.

use super::helpers::{Deployment, account, deployment, request};
use captcha_dispatch::task::{
    domain::{TaskId, TaskStatus},
    services::{ClaimOutcome, DispatchError},
};
use rstest::rstest;
use std::collections::BTreeSet;

const REQUESTER: i64 = 1;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_workers_never_share_a_task(deployment: Deployment) -> eyre::Result<()> {
    for index in 0..40 {
        deployment
            .coordinator
            .create_task(request(REQUESTER, &format!("site-{index}")))
            .await?;
    }

    let mut handles = Vec::new();
    for worker in 100..108 {
        let coordinator = deployment.coordinator.clone();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let ClaimOutcome::Claimed(task) = coordinator.claim_next(account(worker)).await? {
                eyre::ensure!(task.solver_id() == Some(account(worker)));
                claimed.push(task.id());
            }
            Ok::<_, eyre::Report>(claimed)
        }));
    }

    let mut seen = BTreeSet::new();
    for handle in handles {
        for id in handle.await?? {
            eyre::ensure!(seen.insert(id), "task {id} was handed out twice");
        }
    }
    eyre::ensure!(seen.len() == 40, "expected every task claimed once, got {}", seen.len());
    eyre::ensure!(deployment.coordinator.queue_depth().await? == 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tasks_are_claimed_oldest_first(deployment: Deployment) -> eyre::Result<()> {
    let mut created = Vec::new();
    for site_key in ["first", "second", "third"] {
        created.push(deployment.coordinator.create_task(request(REQUESTER, site_key)).await?.id());
    }

    let mut claimed = Vec::new();
    while let ClaimOutcome::Claimed(task) = deployment.coordinator.claim_next(account(20)).await? {
        claimed.push(task.id());
    }

    assert_eq!(claimed, created);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn released_task_is_offered_again_first(deployment: Deployment) -> eyre::Result<()> {
    let older = deployment.coordinator.create_task(request(REQUESTER, "older")).await?;
    deployment.coordinator.create_task(request(REQUESTER, "newer")).await?;
    deployment.coordinator.claim_next(account(20)).await?;

    deployment.coordinator.release_claim(older.id()).await?;

    let ClaimOutcome::Claimed(again) = deployment.coordinator.claim_next(account(21)).await? else {
        eyre::bail!("released task should be claimable");
    };
    assert_eq!(again.id(), older.id());
    assert_eq!(again.attempts(), 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn release_never_reopens_closed_tasks(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(REQUESTER, "k")).await?;
    deployment.coordinator.claim_next(account(20)).await?;
    deployment.coordinator.submit(created.id(), account(20), "token").await?;

    deployment.coordinator.release_claim(created.id()).await?;

    let task = deployment.coordinator.get_task(created.id(), account(REQUESTER)).await?;
    assert_eq!(task.status(), TaskStatus::Solved);
    assert_eq!(
        deployment.coordinator.claim_next(account(21)).await?,
        ClaimOutcome::NoTaskAvailable
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_task_rejects_second_close(deployment: Deployment) -> eyre::Result<()> {
    let created = deployment.coordinator.create_task(request(REQUESTER, "k")).await?;
    deployment.coordinator.claim_next(account(20)).await?;
    deployment
        .coordinator
        .report_failure(created.id(), account(20), "unsolvable")
        .await?;

    let result = deployment.coordinator.submit(created.id(), account(20), "token").await;

    assert!(matches!(result, Err(DispatchError::NotYourTask(id)) if id == created.id()));
    let task = deployment.coordinator.get_task(created.id(), account(REQUESTER)).await?;
    assert_eq!(task.status(), TaskStatus::Failed);
    assert!(task.solution_token().is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_deployment_edges(deployment: Deployment) -> eyre::Result<()> {
    let unknown = TaskId::new(404)?;

    assert_eq!(
        deployment.coordinator.claim_next(account(20)).await?,
        ClaimOutcome::NoTaskAvailable
    );
    assert!(matches!(
        deployment.coordinator.submit(unknown, account(20), "token").await,
        Err(DispatchError::NotYourTask(_))
    ));
    assert!(matches!(
        deployment.coordinator.get_task(unknown, account(REQUESTER)).await,
        Err(DispatchError::NotFound(_))
    ));
    deployment.coordinator.release_claim(unknown).await?;
    assert!(deployment.coordinator.list_for_requester(account(REQUESTER)).await?.is_empty());
    assert_eq!(deployment.coordinator.queue_depth().await?, 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn requesters_only_see_their_own_tasks(deployment: Deployment) -> eyre::Result<()> {
    let mine = deployment.coordinator.create_task(request(1, "mine")).await?;
    let theirs = deployment.coordinator.create_task(request(2, "theirs")).await?;

    let listed = deployment.coordinator.list_for_requester(account(1)).await?;

    assert_eq!(listed, vec![mine]);
    assert!(matches!(
        deployment.coordinator.get_task(theirs.id(), account(1)).await,
        Err(DispatchError::NotFound(_))
    ));
    assert_eq!(deployment.coordinator.queue_depth().await?, 2);
    Ok(())
}
