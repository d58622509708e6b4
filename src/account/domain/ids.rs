//! Identifier and credential scalar types for accounts.

use super::AccountDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database-assigned account identifier shared by requesters and solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Creates a validated account identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDomainError::InvalidAccountId`] when the value is not
    /// positive.
    pub const fn new(value: i64) -> Result<Self, AccountDomainError> {
        if value <= 0 {
            return Err(AccountDomainError::InvalidAccountId(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque API key presented by a caller.
///
/// The key is never printed by [`fmt::Debug`] so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a validated API key.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDomainError::EmptyApiKey`] when the key is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, AccountDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AccountDomainError::EmptyApiKey);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}
