use axum_extra::extract::cookie::{Cookie, CookieJar};
use service_core::axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, RefreshTokenRequest},
    middleware::AuthUser,
    utils::ValidatedJson,
    AppState,
};

use super::{presented_token, refresh_cookie, REFRESH_COOKIE};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, refresh cookie set", body = AuthResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth_service.login(req).await?;
    let cookie = refresh_cookie(res.refresh_token.clone(), state.jwt.refresh_token_ttl());
    Ok((StatusCode::OK, jar.add(cookie), Json(res)))
}

/// Logout and delete the refresh session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body(content = RefreshTokenRequest, description = "Used when the refresh cookie is absent"),
    responses(
        (status = 200, description = "Deleted session", body = RefreshSession),
        (status = 404, description = "No session for this token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let token = presented_token(&jar, body.map(|Json(b)| b)).unwrap_or_default();
    let session = state.auth_service.logout(&token).await?;
    Ok((jar.remove(Cookie::build(REFRESH_COOKIE).path("/")), Json(session)))
}

/// Rotate the refresh token and issue a new pair
#[utoipa::path(
    get,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Tokens rotated, refresh cookie replaced", body = AuthResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let token = presented_token(&jar, body.map(|Json(b)| b));
    let res = state.auth_service.refresh(token.as_deref()).await?;
    let cookie = refresh_cookie(res.refresh_token.clone(), state.jwt.refresh_token_ttl());
    Ok((jar.add(cookie), Json(res)))
}

/// Claims of the presented access token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Missing or invalid access token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn me(user: AuthUser) -> impl IntoResponse {
    Json(user.0.user)
}
