//! Caller roles and the capabilities they grant.

use super::ParseRoleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to an account by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Human solver receiving tasks.
    Worker,
    /// Requester submitting tasks.
    Client,
    /// Operator with every capability.
    Admin,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Client => "client",
            Self::Admin => "admin",
        }
    }

    /// Whether the role may claim tasks and report their outcome.
    #[must_use]
    pub const fn can_solve(self) -> bool {
        matches!(self, Self::Worker | Self::Admin)
    }

    /// Whether the role may create new tasks.
    #[must_use]
    pub const fn can_submit_tasks(self) -> bool {
        matches!(self, Self::Client | Self::Admin)
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(Self::Worker),
            "client" => Ok(Self::Client),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
