//! Authenticated account identities for dispatch callers.
//!
//! Accounts are owned by the surrounding web application. The dispatcher
//! only resolves an API key into an [`domain::Account`] at its boundary and
//! checks the caller's role before invoking coordinator operations.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
