use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{StoreError, UserRepo};
use super::repo_types::{NewUser, ProfilePatch, User};

/// In-process store for local development and tests.
///
/// Email uniqueness is enforced through the `emails` entry lock, so two
/// concurrent creates for one address cannot both succeed. Lock order is
/// always `emails` then `users`.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let now = OffsetDateTime::now_utc();
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email,
                    username: new_user.username,
                    full_name: new_user.full_name,
                    password_hash: new_user.password_hash,
                    role: new_user.role,
                    first_name: None,
                    last_name: None,
                    country: None,
                    phone_number: None,
                    club: None,
                    position: None,
                    experience_years: None,
                    bio: None,
                    profile_picture: None,
                    followers: Vec::new(),
                    following: Vec::new(),
                    notifications: new_user.notifications,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.emails.get(email).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError> {
        patch.validate().map_err(StoreError::Validation)?;
        let mut user = self.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        patch.apply(user.value_mut(), OffsetDateTime::now_utc());
        Ok(user.value().clone())
    }
}
