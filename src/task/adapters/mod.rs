//! Adapter implementations for task dispatch ports.

pub mod memory;
pub mod postgres;
pub mod redis;
