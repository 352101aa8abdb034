//! Persistence seams of the authentication flows.
//!
//! `CredentialStore` owns users and their role assignments; `SessionStore`
//! owns the one refresh session each user may hold. Both are implemented by
//! the PostgreSQL [`Database`](super::Database) and by
//! [`InMemoryStore`](super::InMemoryStore).

use async_trait::async_trait;

use crate::models::{NewUser, RefreshSession, Role, User};
use crate::services::ServiceError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact-match lookup, roles included.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_activation_link(
        &self,
        link: &str,
    ) -> Result<Option<User>, ServiceError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError>;

    /// Insert the user and its role assignment atomically. A concurrent insert
    /// of the same email yields `ServiceError::UserAlreadyExists`.
    async fn create_user_with_role(
        &self,
        new_user: NewUser,
        role: &Role,
    ) -> Result<User, ServiceError>;

    /// Set `is_activated`. Repeating it is harmless.
    async fn activate_user(&self, user_id: i32) -> Result<(), ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// Tokens are passed in clear; implementations store and compare
/// [`RefreshSession::hash_token`] digests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or overwrite the user's session. Last writer wins.
    async fn save_token(
        &self,
        user_id: i32,
        refresh_token: &str,
    ) -> Result<RefreshSession, ServiceError>;

    async fn find_token(&self, refresh_token: &str)
        -> Result<Option<RefreshSession>, ServiceError>;

    /// Replace `current` with `next` in the user's session, only if `current`
    /// is still the stored token. `None` means another request rotated or
    /// revoked it first.
    async fn rotate_token(
        &self,
        user_id: i32,
        current: &str,
        next: &str,
    ) -> Result<Option<RefreshSession>, ServiceError>;

    /// Delete the session holding `refresh_token`, or fail with
    /// `ServiceError::SessionNotFound`.
    async fn remove_token(&self, refresh_token: &str) -> Result<RefreshSession, ServiceError>;
}
