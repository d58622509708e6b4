//! In-memory account directory for tests and single-process deployments.

mod directory;

pub use directory::InMemoryAccountDirectory;
