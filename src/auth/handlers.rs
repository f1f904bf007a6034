use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, PublicProfile, SignupRequest, SignupResponse,
            SignupUser, UpdateResponse,
        },
        guard::{require_auth, CurrentUser},
        services,
    },
    error::AppResult,
    state::AppState,
    users::ProfilePatch,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Routes behind the session guard.
pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/update", put(update_profile))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<SignupResponse>)> {
    let Json(payload) = payload?;
    let (jar, user) = services::signup(&state, jar, payload).await?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SignupResponse {
            message: "User registered successfully".into(),
            user: SignupUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<PublicProfile>)> {
    let Json(payload) = payload?;
    let (jar, user) = services::login(&state, jar, payload).await?;
    Ok((jar, Json(PublicProfile::from(&user))))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = services::logout(&state, jar);
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, current), fields(user_id = %current.0.id))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<PublicProfile>> {
    let user = services::get_me(&state, current.0.id).await?;
    Ok(Json(PublicProfile::from(&user)))
}

#[instrument(skip(state, current, payload), fields(user_id = %current.0.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> AppResult<Json<UpdateResponse>> {
    let Json(patch) = payload?;
    let user = services::update_profile(&state, current.0.id, patch).await?;
    Ok(Json(UpdateResponse {
        message: "Profile updated successfully".into(),
        user: PublicProfile::from(&user),
    }))
}
