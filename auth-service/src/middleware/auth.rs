use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    services::{ServiceError, TokenClaims},
    AppState,
};

/// Token from `Authorization: Bearer <token>`, if the header has that shape.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects the request with 401 unless it carries a valid access token.
/// The decoded claims are stored in the request extensions for [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_token(req.headers())
        .and_then(|token| state.auth_service.validate_access_token(token))
        .ok_or(ServiceError::Unauthorized)?;

    tracing::debug!(user_id = claims.user.id, "Access token accepted");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Claims of the caller, available behind [`auth_middleware`].
pub struct AuthUser(pub TokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenClaims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ServiceError::Unauthorized.into())
    }
}
