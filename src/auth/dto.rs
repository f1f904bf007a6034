use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::{Notification, Role, User};

/// Request body for signup. Absent and `null` fields both land as `None`.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Request body for login.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// What signup hands back about the new account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl From<&User> for SignupUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            username: u.username.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: SignupUser,
}

/// Public projection of a user. No password hash, follower lists reduced to counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub club: Option<String>,
    pub position: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub followers_count: usize,
    pub following_count: usize,
    pub notifications: Vec<Notification>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicProfile {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            username: u.username.clone(),
            full_name: u.full_name.clone(),
            role: u.role,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            country: u.country.clone(),
            phone_number: u.phone_number.clone(),
            club: u.club.clone(),
            position: u.position.clone(),
            experience_years: u.experience_years,
            bio: u.bio.clone(),
            profile_picture: u.profile_picture.clone(),
            followers_count: u.followers.len(),
            following_count: u.following.len(),
            notifications: u.notifications.clone(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: String,
    pub user: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
