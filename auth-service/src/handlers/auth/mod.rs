pub mod registration;
pub mod session;

pub use registration::{activate, register};
pub use session::{login, logout, me, refresh};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::dtos::auth::RefreshTokenRequest;

/// Cookie carrying the refresh token between browser and API.
pub const REFRESH_COOKIE: &str = "refreshToken";

pub(crate) fn refresh_cookie(token: String, max_age: chrono::Duration) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Cookie first, then the JSON body.
pub(crate) fn presented_token(
    jar: &CookieJar,
    body: Option<RefreshTokenRequest>,
) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.and_then(|b| b.refresh_token))
}
