use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::StoreError;

const MAX_BIO_CHARS: usize = 500;
const MAX_SHORT_FIELD_CHARS: usize = 120;
const MAX_PHONE_CHARS: usize = 32;

/// Role a member registers under. Stored as snake_case text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Scout,
    Coach,
    Agent,
    ClubStaff,
    Manager,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Player,
        Role::Scout,
        Role::Coach,
        Role::Agent,
        Role::ClubStaff,
        Role::Manager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Scout => "scout",
            Role::Coach => "coach",
            Role::Agent => "agent",
            Role::ClubStaff => "club_staff",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Message stored inline on the user record. Nothing is dispatched externally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub message: String,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            read: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// User record as the rest of the crate sees it.
#[derive(Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String, // Argon2 PHC string, never leaves the crate
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
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub notifications: Vec<Notification>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Row of the `users` table.
#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub club: Option<String>,
    pub position: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub notifications: Json<Vec<Notification>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

// Hand-written so the hash never ends up in logs or spans.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("corrupt row {}: {}", r.id, e)))?;
        Ok(Self {
            id: r.id,
            email: r.email,
            username: r.username,
            full_name: r.full_name,
            password_hash: r.password_hash,
            role,
            first_name: r.first_name,
            last_name: r.last_name,
            country: r.country,
            phone_number: r.phone_number,
            club: r.club,
            position: r.position,
            experience_years: r.experience_years,
            bio: r.bio,
            profile_picture: r.profile_picture,
            followers: r.followers,
            following: r.following,
            notifications: r.notifications.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Everything needed to insert a user. The id is assigned by the store.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub notifications: Vec<Notification>,
}

/// Sparse profile update. `None` (field absent or null) keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub phone_number: Option<String>,
    pub club: Option<String>,
    pub position: Option<String>,
    pub experience_years: Option<i32>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.country.is_none()
            && self.phone_number.is_none()
            && self.club.is_none()
            && self.position.is_none()
            && self.experience_years.is_none()
            && self.bio.is_none()
            && self.profile_picture.is_none()
            && self.role.is_none()
    }

    /// Field-level checks run by every store before applying the patch.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.experience_years, Some(y) if y < 0) {
            return Err("Experience years cannot be negative".into());
        }
        if matches!(&self.username, Some(u) if u.trim().is_empty()) {
            return Err("Username cannot be empty".into());
        }
        if matches!(&self.full_name, Some(n) if n.trim().is_empty()) {
            return Err("Full name cannot be empty".into());
        }
        if let Some(role) = &self.role {
            role.parse::<Role>().map_err(|_| "Invalid role".to_string())?;
        }
        if matches!(&self.bio, Some(b) if b.chars().count() > MAX_BIO_CHARS) {
            return Err(format!("Bio cannot exceed {} characters", MAX_BIO_CHARS));
        }
        if matches!(&self.phone_number, Some(p) if p.chars().count() > MAX_PHONE_CHARS) {
            return Err("Phone number is too long".into());
        }
        let short_fields = [
            ("Username", &self.username),
            ("Full name", &self.full_name),
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Country", &self.country),
            ("Club", &self.club),
            ("Position", &self.position),
        ];
        for (label, value) in short_fields {
            if matches!(value, Some(v) if v.chars().count() > MAX_SHORT_FIELD_CHARS) {
                return Err(format!("{} is too long", label));
            }
        }
        Ok(())
    }

    /// Role parsed from the patch. Call after `validate`.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn apply(&self, user: &mut User, now: OffsetDateTime) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        set(&mut user.username, &self.username);
        set(&mut user.full_name, &self.full_name);
        set_opt(&mut user.first_name, &self.first_name);
        set_opt(&mut user.last_name, &self.last_name);
        set_opt(&mut user.country, &self.country);
        set_opt(&mut user.phone_number, &self.phone_number);
        set_opt(&mut user.club, &self.club);
        set_opt(&mut user.position, &self.position);
        set_opt(&mut user.experience_years, &self.experience_years);
        set_opt(&mut user.bio, &self.bio);
        set_opt(&mut user.profile_picture, &self.profile_picture);
        if let Some(role) = self.parsed_role() {
            user.role = role;
        }
        user.updated_at = now;
    }
}
