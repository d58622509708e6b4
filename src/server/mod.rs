//! axum HTTP surface: the worker WebSocket, a small REST API for clients,
//! and a health probe.

mod auth;
mod error;
mod routes;
mod state;

pub use auth::{API_KEY_HEADER, Caller};
pub use error::ServerError;
pub use routes::{
    CreateTaskBody, create_task, get_task, health, list_tasks, queue_count, router, upgrade,
};
pub use state::{AppState, DynSessionRunner};
