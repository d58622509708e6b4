//! Transport port for a worker session.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Bidirectional, message-oriented connection to one peer.
#[async_trait]
pub trait WorkerChannel: Send {
    /// Waits for the next text frame.
    ///
    /// Returns `None` once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, SessionError>;

    /// Sends one text frame.
    async fn send(&mut self, frame: String) -> Result<(), SessionError>;
}

/// Fatal session failures. Protocol mistakes are answered in-band instead.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Reading from or writing to the connection failed.
    #[error("session transport failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// An outbound frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl SessionError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
