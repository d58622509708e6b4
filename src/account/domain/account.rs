//! Resolved account snapshot.

use super::{AccountDomainError, AccountId, Role};
use serde::{Deserialize, Serialize};

/// Account resolved from an API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    username: String,
    role: Role,
    balance: f64,
}

impl Account {
    /// Creates an account snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`AccountDomainError::EmptyUsername`] when the username is
    /// blank.
    pub fn new(
        id: AccountId,
        username: impl Into<String>,
        role: Role,
        balance: f64,
    ) -> Result<Self, AccountDomainError> {
        let name = username.into();
        if name.trim().is_empty() {
            return Err(AccountDomainError::EmptyUsername);
        }
        Ok(Self {
            id,
            username: name,
            role,
            balance,
        })
    }

    /// Returns the account identifier.
    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.id
    }

    /// Returns the display username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the account role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the account balance as stored by the billing layer.
    #[must_use]
    pub const fn balance(&self) -> f64 {
        self.balance
    }
}
