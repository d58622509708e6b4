//! Task dispatch and lifecycle coordination.
//!
//! Tasks are created by the submission gate, carried through a durable queue,
//! reconciled into the authoritative store, claimed by workers, and closed as
//! solved or failed. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
