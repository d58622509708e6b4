//! Diesel row models for account lookup.

use super::schema::users;
use diesel::prelude::*;

/// Query result row for account records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountRow {
    /// Account identifier.
    pub id: i64,
    /// Display username.
    pub username: String,
    /// Account role.
    pub role: String,
    /// Account balance.
    pub balance: f64,
}
