//! User model - credential accounts and their public profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Role;

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub is_activated: bool,
    pub activation_link: String,
    pub created_utc: DateTime<Utc>,
    /// Role assignments in assignment order; loaded separately from the row.
    #[sqlx(skip)]
    pub roles: Vec<Role>,
}

impl User {
    /// Public profile embedded in tokens and responses.
    pub fn profile(&self) -> UserDto {
        UserDto::from(self)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

/// Data for a user row that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub activation_link: String,
}

impl NewUser {
    /// Build a new user with a fresh activation link.
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            email,
            password_hash,
            activation_link: Uuid::new_v4().to_string(),
        }
    }
}

/// Public user profile (no credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = false)]
    pub is_activated: bool,
    #[serde(default)]
    #[schema(example = json!(["USER"]))]
    pub roles: Vec<String>,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            is_activated: u.is_activated,
            roles: u.role_names(),
        }
    }
}
