//! Refresh session model - the single active refresh token of a user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Refresh session entity. One row per user; a new login or refresh
/// overwrites it.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSession {
    pub id: i32,
    pub user_id: i32,
    /// SHA-256 of the refresh token.
    #[serde(skip)]
    pub refresh_token_hash: String,
    pub updated_utc: DateTime<Utc>,
}

impl RefreshSession {
    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether this record was issued for `token`.
    pub fn matches(&self, token: &str) -> bool {
        self.refresh_token_hash == Self::hash_token(token)
    }
}
