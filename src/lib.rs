//! `captcha-dispatch`: CAPTCHA task dispatch and lifecycle coordination.
//!
//! Clients submit CAPTCHA tasks, workers claim and solve them, and the
//! coordinator guarantees that no two workers ever hold the same unsolved
//! task at once.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (`PostgreSQL`, Redis,
//!   in-memory)
//!
//! # Modules
//!
//! - [`account`]: Authenticated identities and API key lookup
//! - [`task`]: Task store, durable queue, and the coordinator services
//! - [`session`]: Worker session protocol and state machine
//! - [`server`]: axum HTTP and WebSocket surface
//! - [`config`], [`telemetry`]: Runtime configuration and logging

pub mod account;
pub mod config;
pub mod server;
pub mod session;
pub mod task;
pub mod telemetry;
