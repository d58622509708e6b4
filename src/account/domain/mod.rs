//! Domain model for caller accounts and roles.

mod account;
mod error;
mod ids;
mod role;

pub use account::Account;
pub use error::{AccountDomainError, ParseRoleError};
pub use ids::{AccountId, ApiKey};
pub use role::Role;
