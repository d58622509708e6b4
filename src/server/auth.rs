//! `X-API-Key` caller resolution.

use super::{ServerError, state::AppState};
use crate::account::domain::{Account, AccountId, ApiKey, Role};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authenticated REST caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Caller(Account);

impl Caller {
    /// Wraps an already-resolved account.
    #[must_use]
    pub const fn new(account: Account) -> Self {
        Self(account)
    }

    /// Caller's account identifier.
    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.0.id()
    }

    /// Caller's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role()
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServerError::Unauthorized("missing API key"))?;
        let api_key = ApiKey::new(raw).map_err(|_| ServerError::Unauthorized("missing API key"))?;
        let account = state
            .directory
            .find_by_api_key(&api_key)
            .await?
            .ok_or(ServerError::Unauthorized("invalid API key"))?;
        debug!(account_id = %account.id(), "caller resolved");
        Ok(Self(account))
    }
}
