//! Error types for account value validation.

use thiserror::Error;

/// Errors returned while constructing account domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountDomainError {
    /// Account identifiers are database-assigned and always positive.
    #[error("invalid account identifier {0}, expected a positive integer")]
    InvalidAccountId(i64),

    /// The API key is empty after trimming.
    #[error("api key must not be empty")]
    EmptyApiKey,

    /// The username is empty after trimming.
    #[error("username must not be empty")]
    EmptyUsername,
}

/// Error returned while parsing roles from persistence or the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown account role: {0}")]
pub struct ParseRoleError(pub String);
