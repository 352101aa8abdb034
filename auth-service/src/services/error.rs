use service_core::error::AppError;
use thiserror::Error;

/// Outcomes of the authentication flows. Client-facing messages are
/// localized for the deployment's audience.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Пользователь с таким Email уже есть")]
    UserAlreadyExists,

    /// Shared by "unknown email" and "wrong password".
    #[error("Неверный Email или Пароль")]
    InvalidCredentials,

    #[error("Некорректная ссылка активации")]
    InvalidActivationLink,

    /// Missing, invalid, expired or revoked refresh token.
    #[error("Пользователь не авторизован")]
    Unauthorized,

    #[error("Сессия не найдена")]
    SessionNotFound,

    #[error("Role '{0}' is not seeded")]
    DefaultRoleMissing(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::UserAlreadyExists
            | ServiceError::InvalidCredentials
            | ServiceError::InvalidActivationLink => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::Unauthorized => AppError::Unauthorized(anyhow::anyhow!(err.to_string())),
            ServiceError::SessionNotFound => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            ServiceError::DefaultRoleMissing(_) => {
                AppError::InternalError(anyhow::anyhow!(err.to_string()))
            }
        }
    }
}
