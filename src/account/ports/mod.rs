//! Port contracts for account lookup.

pub mod directory;

pub use directory::{AccountDirectory, AccountDirectoryError, AccountDirectoryResult};
