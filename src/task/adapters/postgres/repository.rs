//! `PostgreSQL` task store.
//!
//! Each mutating method is one guarded `UPDATE ... RETURNING` statement, so the
//! database row is the only synchronisation point between coordinator
//! processes. A claim that loses a race affects zero rows and surfaces as
//! `None`.

use super::{
    models::{NewTaskRow, TaskRow},
    schema::tasks,
};
use crate::account::domain::AccountId;
use crate::task::{
    domain::{
        CaptchaKind, FailureReason, NewTask, PersistedTaskData, SiteKey, SolutionToken, TargetUrl,
        Task, TaskDomainError, TaskId, TaskStatus,
    },
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamptz};

/// `PostgreSQL` connection pool type used by dispatch adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// DDL for the `users` and `tasks` tables and their dispatch indexes.
pub const SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_dispatch_tables/up.sql");

/// Inserts a delivered task or refreshes an existing row that is still
/// unclaimed, keeping its `created_at` and never lowering `attempts`.
///
/// Claimed and closed rows are left to the guarded updates below; the
/// conflict clause compares lifecycle state, never timestamps.
const UPSERT_SQL: &str = "\
INSERT INTO tasks (id, user_id, solver_id, captcha_type, sitekey, target_url, \
captcha_response, status, error_message, attempts, created_at, updated_at) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
ON CONFLICT (id) DO UPDATE SET \
user_id = EXCLUDED.user_id, \
solver_id = EXCLUDED.solver_id, \
captcha_type = EXCLUDED.captcha_type, \
sitekey = EXCLUDED.sitekey, \
target_url = EXCLUDED.target_url, \
captcha_response = EXCLUDED.captcha_response, \
status = EXCLUDED.status, \
error_message = EXCLUDED.error_message, \
attempts = GREATEST(tasks.attempts, EXCLUDED.attempts), \
updated_at = EXCLUDED.updated_at \
WHERE tasks.status = 'pending' AND tasks.solver_id IS NULL";

/// Applies [`SCHEMA_SQL`] using a pooled connection.
///
/// # Errors
///
/// Returns [`TaskStoreError::Persistence`] when a connection cannot be
/// obtained or the DDL fails.
pub async fn apply_schema(pool: &TaskPgPool) -> TaskStoreResult<()> {
    let store = PostgresTaskStore::new(pool.clone());
    store
        .run_blocking(|connection| {
            connection
                .batch_execute(SCHEMA_SQL)
                .map_err(TaskStoreError::persistence)
        })
        .await
}

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn insert(&self, task: &NewTask) -> TaskStoreResult<Task> {
        let new_row = to_new_row(task);
        self.run_blocking(move |connection| {
            let row = diesel::insert_into(tasks::table)
                .values(&new_row)
                .returning(TaskRow::as_returning())
                .get_result::<TaskRow>(connection)
                .map_err(TaskStoreError::persistence)?;
            row_to_task(row)
        })
        .await
    }

    async fn upsert(&self, task: &Task) -> TaskStoreResult<bool> {
        let row = to_reconciled_row(task)?;
        self.run_blocking(move |connection| {
            let written = diesel::sql_query(UPSERT_SQL)
                .bind::<BigInt, _>(row.id)
                .bind::<BigInt, _>(row.user_id)
                .bind::<Nullable<BigInt>, _>(row.solver_id)
                .bind::<Text, _>(row.captcha_type)
                .bind::<Text, _>(row.sitekey)
                .bind::<Text, _>(row.target_url)
                .bind::<Nullable<Text>, _>(row.captcha_response)
                .bind::<Text, _>(row.status)
                .bind::<Nullable<Text>, _>(row.error_message)
                .bind::<Integer, _>(row.attempts)
                .bind::<Timestamptz, _>(row.created_at)
                .bind::<Timestamptz, _>(row.updated_at)
                .execute(connection)
                .map_err(TaskStoreError::persistence)?;
            Ok(written > 0)
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.value()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_oldest_claimable(&self) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::solver_id.is_null())
                .filter(tasks::status.eq(TaskStatus::Pending.as_str()))
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn try_claim(
        &self,
        id: TaskId,
        worker: AccountId,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.value()))
                    .filter(tasks::solver_id.is_null())
                    .filter(tasks::status.eq(TaskStatus::Pending.as_str())),
            )
            .set((
                tasks::solver_id.eq(Some(worker.value())),
                tasks::status.eq(TaskStatus::Assigned.as_str()),
                tasks::attempts.eq(tasks::attempts + 1),
                tasks::updated_at.eq(at),
            ))
            .returning(TaskRow::as_returning())
            .get_result::<TaskRow>(connection)
            .optional()
            .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn release_claim(&self, id: TaskId, at: DateTime<Utc>) -> TaskStoreResult<()> {
        self.run_blocking(move |connection| {
            diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.value()))
                    .filter(tasks::status.eq(TaskStatus::Assigned.as_str())),
            )
            .set((
                tasks::solver_id.eq(None::<i64>),
                tasks::status.eq(TaskStatus::Pending.as_str()),
                tasks::updated_at.eq(at),
            ))
            .execute(connection)
            .map_err(TaskStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn record_solution(
        &self,
        id: TaskId,
        worker: AccountId,
        token: &SolutionToken,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        let token_value = token.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.value()))
                    .filter(tasks::solver_id.eq(worker.value()))
                    .filter(tasks::status.eq(TaskStatus::Assigned.as_str()))
                    .filter(tasks::captcha_response.is_null()),
            )
            .set((
                tasks::captcha_response.eq(Some(token_value)),
                tasks::status.eq(TaskStatus::Solved.as_str()),
                tasks::updated_at.eq(at),
            ))
            .returning(TaskRow::as_returning())
            .get_result::<TaskRow>(connection)
            .optional()
            .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn record_failure(
        &self,
        id: TaskId,
        worker: AccountId,
        reason: &FailureReason,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        let reason_value = reason.as_str().to_owned();
        self.run_blocking(move |connection| {
            let row = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.value()))
                    .filter(tasks::solver_id.eq(worker.value()))
                    .filter(tasks::status.eq(TaskStatus::Assigned.as_str()))
                    .filter(tasks::captcha_response.is_null()),
            )
            .set((
                tasks::error_message.eq(Some(reason_value)),
                tasks::status.eq(TaskStatus::Failed.as_str()),
                tasks::updated_at.eq(at),
            ))
            .returning(TaskRow::as_returning())
            .get_result::<TaskRow>(connection)
            .optional()
            .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_for_requester(&self, requester: AccountId) -> TaskStoreResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::user_id.eq(requester.value()))
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskStoreError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn count_pending(&self) -> TaskStoreResult<u64> {
        self.run_blocking(move |connection| {
            let count = tasks::table
                .filter(tasks::status.eq(TaskStatus::Pending.as_str()))
                .count()
                .get_result::<i64>(connection)
                .map_err(TaskStoreError::persistence)?;
            u64::try_from(count).map_err(TaskStoreError::persistence)
        })
        .await
    }
}

fn to_new_row(task: &NewTask) -> NewTaskRow {
    NewTaskRow {
        user_id: task.requester_id().value(),
        captcha_type: task.kind().as_str().to_owned(),
        sitekey: task.site_key().as_str().to_owned(),
        target_url: task.target_url().as_str().to_owned(),
        status: TaskStatus::Pending.as_str().to_owned(),
        attempts: 0,
        created_at: task.created_at(),
        updated_at: task.created_at(),
    }
}

fn to_reconciled_row(task: &Task) -> TaskStoreResult<TaskRow> {
    let attempts = i32::try_from(task.attempts()).map_err(TaskStoreError::persistence)?;
    Ok(TaskRow {
        id: task.id().value(),
        user_id: task.requester_id().value(),
        solver_id: task.solver_id().map(AccountId::value),
        captcha_type: task.kind().as_str().to_owned(),
        sitekey: task.site_key().as_str().to_owned(),
        target_url: task.target_url().as_str().to_owned(),
        captcha_response: task.solution_token().map(|token| token.as_str().to_owned()),
        status: task.status().as_str().to_owned(),
        error_message: task.failure_reason().map(|reason| reason.as_str().to_owned()),
        attempts,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

/// Converts a row, reporting any invalid column as a corrupt row instead of
/// skipping it.
fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let row_id = row.id;
    convert_row(row).map_err(|reason| TaskStoreError::CorruptRow { id: row_id, reason })
}

fn convert_row(row: TaskRow) -> Result<Task, String> {
    let TaskRow {
        id,
        user_id,
        solver_id,
        captcha_type,
        sitekey,
        target_url,
        captcha_response,
        status: persisted_status,
        error_message,
        attempts: persisted_attempts,
        created_at,
        updated_at,
    } = row;

    let status = TaskStatus::try_from(persisted_status.as_str()).map_err(|err| err.to_string())?;
    let attempts = u32::try_from(persisted_attempts).map_err(|err| err.to_string())?;
    let data = build_persisted(
        PersistedColumns {
            id,
            user_id,
            solver_id,
            captcha_type,
            sitekey,
            target_url,
            captcha_response,
            error_message,
        },
        status,
        attempts,
        (created_at, updated_at),
    )
    .map_err(|err| err.to_string())?;
    Task::from_persisted(data).map_err(|err| err.to_string())
}

struct PersistedColumns {
    id: i64,
    user_id: i64,
    solver_id: Option<i64>,
    captcha_type: String,
    sitekey: String,
    target_url: String,
    captcha_response: Option<String>,
    error_message: Option<String>,
}

fn build_persisted(
    columns: PersistedColumns,
    status: TaskStatus,
    attempts: u32,
    (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>),
) -> Result<PersistedTaskData, TaskDomainError> {
    Ok(PersistedTaskData {
        id: TaskId::new(columns.id)?,
        requester_id: AccountId::new(columns.user_id)?,
        solver_id: columns.solver_id.map(AccountId::new).transpose()?,
        kind: CaptchaKind::try_from(columns.captcha_type.as_str())?,
        site_key: SiteKey::new(columns.sitekey)?,
        target_url: TargetUrl::new(columns.target_url)?,
        solution_token: columns
            .captcha_response
            .map(SolutionToken::new)
            .transpose()?,
        failure_reason: columns.error_message.map(FailureReason::new).transpose()?,
        status,
        attempts,
        created_at,
        updated_at,
    })
}
