//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: i64,
    /// Submitting requester.
    pub user_id: i64,
    /// Current or final solver.
    pub solver_id: Option<i64>,
    /// CAPTCHA kind.
    pub captcha_type: String,
    /// Site key.
    pub sitekey: String,
    /// Target URL.
    pub target_url: String,
    /// Solution token.
    pub captcha_response: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Failure reason.
    pub error_message: Option<String>,
    /// Number of successful claims.
    pub attempts: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for freshly submitted tasks; the identifier is generated.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Submitting requester.
    pub user_id: i64,
    /// CAPTCHA kind.
    pub captcha_type: String,
    /// Site key.
    pub sitekey: String,
    /// Target URL.
    pub target_url: String,
    /// Lifecycle status.
    pub status: String,
    /// Number of successful claims.
    pub attempts: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
