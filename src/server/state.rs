//! Shared application state.

use crate::account::ports::AccountDirectory;
use crate::session::SessionRunner;
use crate::task::{
    ports::{TaskPublisher, TaskStore},
    services::DynTaskCoordinator,
};
use mockable::DefaultClock;
use std::sync::Arc;

/// Session runner wired to trait objects.
pub type DynSessionRunner =
    SessionRunner<dyn AccountDirectory, dyn TaskStore, dyn TaskPublisher, DefaultClock>;

/// State shared by every handler.
pub struct AppState {
    /// Coordinator used by REST handlers.
    pub coordinator: DynTaskCoordinator,
    /// API key lookup for REST callers.
    pub directory: Arc<dyn AccountDirectory>,
    /// Session protocol driver for WebSocket connections.
    pub sessions: DynSessionRunner,
}

impl AppState {
    /// Builds state whose sessions share `coordinator` and `directory`.
    #[must_use]
    pub fn new(coordinator: DynTaskCoordinator, directory: Arc<dyn AccountDirectory>) -> Self {
        let sessions = SessionRunner::new(Arc::clone(&directory), coordinator.clone());
        Self {
            coordinator,
            directory,
            sessions,
        }
    }

    /// Replaces the session runner, typically to change its auth timeout.
    #[must_use]
    pub fn with_sessions(mut self, sessions: DynSessionRunner) -> Self {
        self.sessions = sessions;
        self
    }
}
