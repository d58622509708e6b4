//! `PostgreSQL` adapters for task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskStore, SCHEMA_SQL, TaskPgPool, apply_schema};
