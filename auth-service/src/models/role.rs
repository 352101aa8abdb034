//! Role model - named capabilities assigned to users.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role every new account receives.
pub const DEFAULT_ROLE: &str = "USER";

/// Role entity. Roles are seed data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

impl Role {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
