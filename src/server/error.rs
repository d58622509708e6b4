//! HTTP error mapping.
//!
//! Store and directory failures are logged in full and reported to the
//! caller as a generic message.

use crate::account::ports::AccountDirectoryError;
use crate::task::services::DispatchError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The `X-API-Key` header is missing or matches no account.
    #[error("unauthorised: {0}")]
    Unauthorized(&'static str),

    /// The caller's role may not use the endpoint.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// A coordinator operation failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The account lookup failed.
    #[error(transparent)]
    Directory(#[from] AccountDirectoryError),
}

impl ServerError {
    /// Status code and client-facing message for this error.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, (*message).to_owned()),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, (*message).to_owned()),
            Self::Dispatch(DispatchError::InvalidInput(inner)) => {
                (StatusCode::BAD_REQUEST, inner.to_string())
            }
            Self::Dispatch(err @ DispatchError::NotYourTask(_)) => {
                (StatusCode::FORBIDDEN, err.to_string())
            }
            Self::Dispatch(err @ DispatchError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            Self::Dispatch(err @ DispatchError::QueuePublishFailure(_)) => {
                warn!(error = %err, "queue publish failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "failed to queue task".to_owned(),
                )
            }
            Self::Dispatch(err @ DispatchError::StoreUnavailable(_)) => {
                error!(error = %err, "task store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            Self::Directory(err) => {
                error!(error = %err, "account directory failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (
            status,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}
