//! Directory port resolving API keys into accounts.

use crate::account::domain::{Account, ApiKey};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for account directory operations.
pub type AccountDirectoryResult<T> = Result<T, AccountDirectoryError>;

/// Read-only account lookup contract.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Finds the account owning the given API key.
    ///
    /// Returns `None` when no account matches.
    async fn find_by_api_key(&self, api_key: &ApiKey) -> AccountDirectoryResult<Option<Account>>;
}

/// Errors returned by account directory implementations.
#[derive(Debug, Clone, Error)]
pub enum AccountDirectoryError {
    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AccountDirectoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
