//! axum WebSocket adapter for [`WorkerChannel`].

use super::{SessionError, WorkerChannel};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};

/// [`WorkerChannel`] over an upgraded axum WebSocket.
///
/// Only text frames carry protocol messages. Binary, ping, and pong frames
/// are skipped; axum answers pings itself.
pub struct WebSocketChannel {
    socket: WebSocket,
}

impl WebSocketChannel {
    /// Wraps an upgraded socket.
    #[must_use]
    pub const fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Frame(String),
    Skip,
    Closed,
}

fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Frame(text.as_str().to_owned()),
        Message::Close(_) => Inbound::Closed,
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => Inbound::Skip,
    }
}

#[async_trait]
impl WorkerChannel for WebSocketChannel {
    async fn recv(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            let Some(received) = self.socket.recv().await else {
                return Ok(None);
            };
            match classify(received.map_err(SessionError::transport)?) {
                Inbound::Frame(frame) => return Ok(Some(frame)),
                Inbound::Closed => return Ok(None),
                Inbound::Skip => {}
            }
        }
    }

    async fn send(&mut self, frame: String) -> Result<(), SessionError> {
        self.socket
            .send(Message::Text(frame.into()))
            .await
            .map_err(SessionError::transport)
    }
}
