//! `PostgreSQL` adapter for account lookup.

mod directory;
mod models;
mod schema;

pub use directory::PostgresAccountDirectory;
