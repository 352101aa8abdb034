//! PostgreSQL store for users, roles and refresh sessions.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::models::{NewUser, RefreshSession, Role, User};
use crate::services::{CredentialStore, ServiceError, SessionStore};

const USER_COLUMNS: &str = "id, email, password, is_activated, activation_link, created_utc";
const SESSION_COLUMNS: &str = "id, user_id, refresh_token_hash, updated_utc";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn roles_for_user(&self, user_id: i32) -> Result<Vec<Role>, ServiceError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY ur.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn with_roles(&self, user: Option<User>) -> Result<Option<User>, ServiceError> {
        match user {
            Some(mut user) => {
                user.roles = self.roles_for_user(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roles(user).await
    }

    async fn find_user_by_id(&self, user_id: i32) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roles(user).await
    }

    async fn find_user_by_activation_link(
        &self,
        link: &str,
    ) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE activation_link = $1"
        ))
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;
        self.with_roles(user).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, ServiceError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn create_user_with_role(
        &self,
        new_user: NewUser,
        role: &Role,
    ) -> Result<User, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let mut user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password, activation_link)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.activation_link)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::UserAlreadyExists
            } else {
                ServiceError::Database(e)
            }
        })?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(role.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        user.roles = vec![role.clone()];
        Ok(user)
    }

    async fn activate_user(&self, user_id: i32) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET is_activated = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        crate::db::health_check(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn save_token(
        &self,
        user_id: i32,
        refresh_token: &str,
    ) -> Result<RefreshSession, ServiceError> {
        let session = sqlx::query_as::<_, RefreshSession>(&format!(
            r#"
            INSERT INTO tokens (user_id, refresh_token_hash, updated_utc)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET refresh_token_hash = EXCLUDED.refresh_token_hash,
                updated_utc = EXCLUDED.updated_utc
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(RefreshSession::hash_token(refresh_token))
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn find_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<RefreshSession>, ServiceError> {
        let session = sqlx::query_as::<_, RefreshSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM tokens WHERE refresh_token_hash = $1"
        ))
        .bind(RefreshSession::hash_token(refresh_token))
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn rotate_token(
        &self,
        user_id: i32,
        current: &str,
        next: &str,
    ) -> Result<Option<RefreshSession>, ServiceError> {
        // Single statement: of two concurrent rotations of the same token,
        // only the first finds the old hash.
        let session = sqlx::query_as::<_, RefreshSession>(&format!(
            r#"
            UPDATE tokens
            SET refresh_token_hash = $3, updated_utc = NOW()
            WHERE user_id = $1 AND refresh_token_hash = $2
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(RefreshSession::hash_token(current))
        .bind(RefreshSession::hash_token(next))
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn remove_token(&self, refresh_token: &str) -> Result<RefreshSession, ServiceError> {
        sqlx::query_as::<_, RefreshSession>(&format!(
            "DELETE FROM tokens WHERE refresh_token_hash = $1 RETURNING {SESSION_COLUMNS}"
        ))
        .bind(RefreshSession::hash_token(refresh_token))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::SessionNotFound)
    }
}
