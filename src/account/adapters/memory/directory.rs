//! Thread-safe in-memory account directory.

use crate::account::{
    domain::{Account, ApiKey},
    ports::{AccountDirectory, AccountDirectoryError, AccountDirectoryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory account directory keyed by API key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountDirectory {
    accounts: Arc<RwLock<HashMap<ApiKey, Account>>>,
}

impl InMemoryAccountDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the account owning `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDirectoryError::Persistence`] when the lock is
    /// poisoned.
    pub fn register(&self, api_key: ApiKey, account: Account) -> AccountDirectoryResult<()> {
        let mut accounts = self.accounts.write().map_err(|err| {
            AccountDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        accounts.insert(api_key, account);
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_api_key(&self, api_key: &ApiKey) -> AccountDirectoryResult<Option<Account>> {
        let accounts = self.accounts.read().map_err(|err| {
            AccountDirectoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(accounts.get(api_key).cloned())
    }
}
