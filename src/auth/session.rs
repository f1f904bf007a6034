//! Session cookie issuance, clearing and token verification.
//!
//! Tokens are stateless: nothing is stored server-side, so clearing the
//! cookie at logout cannot revoke a copy of the token held elsewhere. It
//! stays valid until `exp`.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{
    config::CookieConfig,
    error::{AppError, AppResult},
};

fn session_cookie(cfg: &CookieConfig, value: String, max_age: Duration) -> Cookie<'static> {
    Cookie::build((cfg.name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(cfg.secure)
        .max_age(max_age)
        .build()
}

/// Sign a token for `user_id` and attach it to `jar` as the session cookie.
pub fn issue(
    keys: &JwtKeys,
    cfg: &CookieConfig,
    jar: CookieJar,
    user_id: Uuid,
) -> anyhow::Result<CookieJar> {
    let token = keys.sign(user_id)?;
    Ok(jar.add(session_cookie(cfg, token, keys.ttl)))
}

/// Overwrite the session cookie with an empty, already-expired value.
pub fn clear(cfg: &CookieConfig, jar: CookieJar) -> CookieJar {
    jar.add(session_cookie(cfg, String::new(), Duration::ZERO))
}

/// Session cookie first, then `Authorization: Bearer`.
pub fn extract_token(jar: &CookieJar, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Resolve a token to the user id it was issued for.
pub fn verify(keys: &JwtKeys, token: Option<&str>) -> AppResult<Uuid> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingToken)?;
    match keys.verify(token) {
        Ok(claims) => Ok(claims.sub),
        Err(e) => {
            warn!(error = %e, "invalid or expired token");
            Err(AppError::InvalidToken)
        }
    }
}
