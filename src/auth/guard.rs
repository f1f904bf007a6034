use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::{jwt::JwtKeys, session};
use crate::{error::AppError, state::AppState, users::User};

/// Live user record resolved from the session, placed in request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Rejects the request with 401 unless it carries a valid token for a user
/// that still exists. The downstream handler is never invoked on failure.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session::extract_token(&jar, request.headers(), &state.config.cookie.name);
    let keys = JwtKeys::from_ref(&state);
    let user_id = session::verify(&keys, token.as_deref())?;

    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token for unknown user");
        AppError::Unauthorized
    })?;

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
