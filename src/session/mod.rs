//! Worker Session Channel.
//!
//! One long-lived connection per worker or client. The [`runner`] owns the
//! state machine and talks to the peer only through the [`WorkerChannel`]
//! port; [`websocket`] adapts an axum socket to that port.

pub mod channel;
pub mod protocol;
pub mod runner;
pub mod websocket;

pub use channel::{SessionError, WorkerChannel};
pub use runner::{DEFAULT_AUTH_TIMEOUT, SessionEnd, SessionRunner, WorkerSession};

#[cfg(test)]
mod tests;
