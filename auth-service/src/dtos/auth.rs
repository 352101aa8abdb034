use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::UserDto;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Введите корректный Email"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 5, message = "Минимальное количество символов для пароля 5"))]
    #[schema(example = "password123", min_length = 5)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Введите корректный Email"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Введите пароль"))]
    #[schema(example = "password123")]
    pub password: String,
}

/// Body fallback for clients that cannot send the refresh cookie.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub refresh_token: Option<String>,
}

/// Tokens and profile returned by register, login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}
