//! HTTP and WebSocket handlers.

use super::{Caller, ServerError, state::AppState};
use crate::session::{SessionEnd, protocol::StatusMessage, websocket::WebSocketChannel};
use crate::task::{
    domain::{TaskId, TaskRecord},
    services::{CreateTaskRequest, DispatchError},
};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body accepted by `POST /api/tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskBody {
    /// Site key.
    pub sitekey: String,
    /// Target URL.
    pub target_url: String,
    /// CAPTCHA kind; defaults to `hcaptcha`.
    #[serde(default)]
    pub captcha_type: Option<String>,
}

/// Registers every route.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(upgrade))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", get(get_task))
        .route("/api/queue/count", get(queue_count))
        .with_state(state)
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Upgrades to a worker session.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let mut channel = WebSocketChannel::new(socket);
        match state.sessions.run(&mut channel).await {
            Ok(SessionEnd::Rejected) => debug!("websocket closed before authentication"),
            Ok(SessionEnd::Disconnected { worker_id, .. }) => {
                debug!(worker_id = %worker_id, "websocket disconnected");
            }
            Err(err) => warn!(error = %err, "websocket session failed"),
        }
    })
}

/// `POST /api/tasks`: submits a task for the calling client.
///
/// # Errors
///
/// Returns [`ServerError::Forbidden`] for roles that cannot submit tasks, or
/// the coordinator error.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(body): Json<CreateTaskBody>,
) -> Result<Json<StatusMessage>, ServerError> {
    if !caller.role().can_submit_tasks() {
        return Err(ServerError::Forbidden("only clients and admins can create tasks"));
    }
    let request = CreateTaskRequest::new(caller.id(), body.sitekey, body.target_url)
        .with_optional_kind(body.captcha_type);
    let task = state.coordinator.create_task(request).await?;
    info!(task_id = %task.id(), "task submitted over http");
    Ok(Json(StatusMessage::TaskCreated {
        task: TaskRecord::from(&task),
    }))
}

/// `GET /api/tasks`: the caller's own tasks, oldest first.
///
/// # Errors
///
/// Returns the coordinator error.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<StatusMessage>, ServerError> {
    let tasks = state.coordinator.list_for_requester(caller.id()).await?;
    Ok(Json(StatusMessage::TaskList {
        tasks: tasks.iter().map(TaskRecord::from).collect(),
    }))
}

/// `GET /api/tasks/{id}`: one of the caller's tasks.
///
/// # Errors
///
/// Returns a not-found error when the task is missing or owned by someone
/// else.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<TaskRecord>, ServerError> {
    let task_id = TaskId::new(id).map_err(DispatchError::InvalidInput)?;
    let task = state.coordinator.get_task(task_id, caller.id()).await?;
    Ok(Json(TaskRecord::from(&task)))
}

/// `GET /api/queue/count`: number of pending tasks.
///
/// # Errors
///
/// Returns the coordinator error.
pub async fn queue_count(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Result<Json<StatusMessage>, ServerError> {
    let count = state.coordinator.queue_depth().await?;
    Ok(Json(StatusMessage::QueueCount { count }))
}
