//! `PostgreSQL` account directory implementation.

use super::{models::AccountRow, schema::users};
use crate::account::{
    domain::{Account, AccountId, ApiKey, Role},
    ports::{AccountDirectory, AccountDirectoryError, AccountDirectoryResult},
};
use crate::task::adapters::postgres::TaskPgPool;
use async_trait::async_trait;
use diesel::prelude::*;

/// `PostgreSQL`-backed account directory sharing the task connection pool.
#[derive(Debug, Clone)]
pub struct PostgresAccountDirectory {
    pool: TaskPgPool,
}

impl PostgresAccountDirectory {
    /// Creates a directory from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    async fn find_by_api_key(&self, api_key: &ApiKey) -> AccountDirectoryResult<Option<Account>> {
        let pool = self.pool.clone();
        let key = api_key.as_str().to_owned();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AccountDirectoryError::persistence)?;
            let row = users::table
                .filter(users::api_key.eq(key))
                .select(AccountRow::as_select())
                .first::<AccountRow>(&mut connection)
                .optional()
                .map_err(AccountDirectoryError::persistence)?;
            row.map(row_to_account).transpose()
        })
        .await
        .map_err(AccountDirectoryError::persistence)?
    }
}

fn row_to_account(row: AccountRow) -> AccountDirectoryResult<Account> {
    let id = AccountId::new(row.id).map_err(AccountDirectoryError::persistence)?;
    let role = Role::try_from(row.role.as_str()).map_err(AccountDirectoryError::persistence)?;
    Account::new(id, row.username, role, row.balance).map_err(AccountDirectoryError::persistence)
}
