use axum_extra::extract::cookie::CookieJar;
use service_core::axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{dtos::auth::RegisterRequest, utils::ValidatedJson, AppState};

use super::refresh_cookie;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, refresh cookie set", body = AuthResponse),
        (status = 400, description = "Email already registered or invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.register(req).await?;
    let cookie = refresh_cookie(res.refresh_token.clone(), state.jwt.refresh_token_ttl());
    Ok((StatusCode::CREATED, jar.add(cookie), Json(res)))
}

/// Activate an account from the emailed link
#[utoipa::path(
    get,
    path = "/api/auth/activate/{link}",
    params(("link" = String, Path, description = "Activation token from the email")),
    responses(
        (status = 200, description = "Account activated"),
        (status = 400, description = "Unknown activation link", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn activate(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> Result<StatusCode, AppError> {
    state.auth_service.activate(&link).await?;
    Ok(StatusCode::OK)
}
