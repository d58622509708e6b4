//! Adapter implementations for account lookup.

pub mod memory;
pub mod postgres;
