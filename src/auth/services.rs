use axum::extract::FromRef;
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, SignupRequest},
    jwt::JwtKeys,
    password, session,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{NewUser, Notification, ProfilePatch, Role, User},
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn welcome_notification(full_name: &str) -> Notification {
    Notification::new(format!(
        "Welcome to Pitchlink, {}! Complete your profile so clubs and scouts can find you.",
        full_name
    ))
}

/// Register a user and open a session for them.
pub async fn signup(
    st: &AppState,
    jar: CookieJar,
    req: SignupRequest,
) -> AppResult<(CookieJar, User)> {
    fn trimmed(field: Option<String>) -> String {
        field.as_deref().map(str::trim).unwrap_or_default().to_string()
    }

    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    let username = trimmed(req.username);
    let full_name = trimmed(req.full_name);
    let role = trimmed(req.role);
    let plain = req.password.unwrap_or_default();

    if email.is_empty()
        || username.is_empty()
        || full_name.is_empty()
        || plain.is_empty()
        || role.is_empty()
    {
        return Err(AppError::BadRequest("All fields are required".into()));
    }

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::InvalidEmail);
    }

    let role: Role = role.parse().map_err(|_| {
        warn!(role = %role, "invalid role");
        AppError::InvalidRole
    })?;

    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = password::hash_offloaded(plain).await?;

    // Uniqueness is decided by the store; a concurrent duplicate lands here as UserExists.
    let user = st
        .users
        .create(NewUser {
            notifications: vec![welcome_notification(&full_name)],
            email,
            username,
            full_name,
            password_hash,
            role,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            AppError::from(e)
        })?;

    let keys = JwtKeys::from_ref(st);
    let jar = session::issue(&keys, &st.config.cookie, jar, user.id)?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok((jar, user))
}

/// Check credentials and open a session. Unknown email and wrong password
/// are indistinguishable to the caller.
pub async fn login(
    st: &AppState,
    jar: CookieJar,
    req: LoginRequest,
) -> AppResult<(CookieJar, User)> {
    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    let plain = req.password.unwrap_or_default();

    let user = match st.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            password::verify_against_dummy(plain).await?;
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    let ok = password::verify_offloaded(plain, user.password_hash.clone()).await?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(st);
    let jar = session::issue(&keys, &st.config.cookie, jar, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((jar, user))
}

/// Always succeeds, with or without a session.
pub fn logout(st: &AppState, jar: CookieJar) -> CookieJar {
    session::clear(&st.config.cookie, jar)
}

pub async fn get_me(st: &AppState, user_id: Uuid) -> AppResult<User> {
    st.users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn update_profile(st: &AppState, user_id: Uuid, patch: ProfilePatch) -> AppResult<User> {
    // Nothing to write; leave updated_at alone.
    if patch.is_empty() {
        return get_me(st, user_id).await;
    }
    let user = st.users.update(user_id, &patch).await.map_err(|e| {
        warn!(error = %e, user_id = %user_id, "profile update rejected");
        AppError::from(e)
    })?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn state() -> AppState {
        AppState::in_memory(AppConfig::test_default())
    }

    fn signup_req(email: &str, role: &str) -> SignupRequest {
        SignupRequest {
            email: Some(email.into()),
            username: Some("winger7".into()),
            full_name: Some("Kofi Winger".into()),
            password: Some("long-enough-pass".into()),
            role: Some(role.into()),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("scout@club.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("no@tld"));
        assert!(!is_valid_email("spa ce@x.io"));
        assert!(!is_valid_email("@x.io"));
    }

    #[tokio::test]
    async fn signup_normalizes_hashes_and_notifies() {
        let st = state();
        let (jar, user) = signup(&st, CookieJar::new(), signup_req("  New@Club.IO ", "scout"))
            .await
            .unwrap();
        assert_eq!(user.email, "new@club.io");
        assert_eq!(user.role, Role::Scout);
        assert_ne!(user.password_hash, "long-enough-pass");
        assert!(password::verify_password("long-enough-pass", &user.password_hash).unwrap());
        assert_eq!(user.notifications.len(), 1);
        assert!(user.notifications[0].message.contains("Kofi Winger"));
        assert!(jar.get("jwt").is_some());
    }

    #[tokio::test]
    async fn signup_validation_errors() {
        let st = state();
        let err = signup(&st, CookieJar::new(), signup_req("not-an-email", "player"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidEmail));

        let err = signup(&st, CookieJar::new(), signup_req("ref@club.io", "referee"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRole));

        let mut short = signup_req("short@club.io", "player");
        short.password = Some("short".into());
        let err = signup(&st, CookieJar::new(), short).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut missing = signup_req("missing@club.io", "player");
        missing.username = Some("  ".into());
        let err = signup(&st, CookieJar::new(), missing).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let mut null_role = signup_req("nullrole@club.io", "player");
        null_role.role = None;
        let err = signup(&st, CookieJar::new(), null_role).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn signup_duplicate_email_is_user_exists() {
        let st = state();
        signup(&st, CookieJar::new(), signup_req("dup@club.io", "coach"))
            .await
            .unwrap();
        let err = signup(&st, CookieJar::new(), signup_req("DUP@club.io", "agent"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserExists));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_duplicate_signups_have_one_winner() {
        let st = state();
        let (a, b) = tokio::join!(
            signup(&st, CookieJar::new(), signup_req("race@club.io", "player")),
            signup(&st, CookieJar::new(), signup_req("race@club.io", "manager")),
        );
        let results = [a.is_ok(), b.is_ok()];
        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, AppError::UserExists));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let st = state();
        signup(&st, CookieJar::new(), signup_req("known@club.io", "player"))
            .await
            .unwrap();

        let wrong_pw = login(&st, CookieJar::new(), login_req("known@club.io", "bad-password"))
            .await
            .unwrap_err();
        let unknown = login(&st, CookieJar::new(), login_req("ghost@club.io", "bad-password"))
            .await
            .unwrap_err();
        assert!(matches!(wrong_pw, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
        assert_eq!(wrong_pw.status(), unknown.status());
    }

    #[tokio::test]
    async fn login_token_resolves_to_same_user() {
        let st = state();
        let (_, registered) = signup(&st, CookieJar::new(), signup_req("me@club.io", "player"))
            .await
            .unwrap();
        let (jar, user) = login(&st, CookieJar::new(), login_req("ME@club.io", "long-enough-pass"))
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);

        let token = jar.get("jwt").unwrap().value().to_string();
        let keys = JwtKeys::from_ref(&st);
        let user_id = session::verify(&keys, Some(token.as_str())).unwrap();
        let me = get_me(&st, user_id).await.unwrap();
        assert_eq!(me.id, registered.id);
    }

    #[tokio::test]
    async fn get_me_unknown_id_is_not_found() {
        let st = state();
        let err = get_me(&st, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_profile_is_sparse() {
        let st = state();
        let (_, user) = signup(&st, CookieJar::new(), signup_req("sparse@club.io", "player"))
            .await
            .unwrap();
        update_profile(
            &st,
            user.id,
            ProfilePatch {
                country: Some("Nigeria".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let updated = update_profile(
            &st,
            user.id,
            ProfilePatch {
                country: None,
                phone_number: Some("123".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.phone_number.as_deref(), Some("123"));
        assert_eq!(updated.country.as_deref(), Some("Nigeria"));
        assert_eq!(updated.full_name, "Kofi Winger");
    }

    #[tokio::test]
    async fn empty_update_leaves_record_untouched() {
        let st = state();
        let (_, user) = signup(&st, CookieJar::new(), signup_req("noop@club.io", "scout"))
            .await
            .unwrap();
        let after = update_profile(&st, user.id, ProfilePatch::default())
            .await
            .unwrap();
        assert_eq!(after.updated_at, user.updated_at);
        assert_eq!(after.username, user.username);
    }

    #[tokio::test]
    async fn update_profile_validation_and_missing_user() {
        let st = state();
        let (_, user) = signup(&st, CookieJar::new(), signup_req("val@club.io", "player"))
            .await
            .unwrap();
        let err = update_profile(
            &st,
            user.id,
            ProfilePatch {
                experience_years: Some(-2),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_profile(&st, Uuid::new_v4(), ProfilePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
