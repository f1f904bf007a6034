use async_trait::async_trait;
use sqlx::{error::ErrorKind, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::repo_types::{NewUser, ProfilePatch, User, UserRow};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            match db.kind() {
                ErrorKind::UniqueViolation => return StoreError::DuplicateEmail,
                ErrorKind::CheckViolation => {
                    return StoreError::Validation(format!("constraint violated: {}", db.message()))
                }
                _ => {}
            }
        }
        StoreError::Backend(e.into())
    }
}

/// Persistence of user records. Email uniqueness is the store's job.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user; `DuplicateEmail` if the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Validate and apply a sparse patch; `NotFound` if the id does not resolve.
    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError>;
}

const USER_COLUMNS: &str = "id, email, username, full_name, password_hash, role, \
    first_name, last_name, country, phone_number, club, position, experience_years, \
    bio, profile_picture, followers, following, notifications, created_at, updated_at";

/// PostgreSQL-backed store. Relies on the `users_email_key` unique index.
#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, username, full_name, password_hash, role, notifications)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.username)
            .bind(&new_user.full_name)
            .bind(&new_user.password_hash)
            .bind(new_user.role.as_str())
            .bind(sqlx::types::Json(&new_user.notifications))
            .fetch_one(&self.db)
            .await?;
        debug!(user_id = %row.id, "user row inserted");
        row.try_into()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<User, StoreError> {
        patch.validate().map_err(StoreError::Validation)?;

        // COALESCE keeps the stored value for every field the patch leaves out.
        let sql = format!(
            r#"
            UPDATE users SET
                username         = COALESCE($2, username),
                full_name        = COALESCE($3, full_name),
                first_name       = COALESCE($4, first_name),
                last_name        = COALESCE($5, last_name),
                country          = COALESCE($6, country),
                phone_number     = COALESCE($7, phone_number),
                club             = COALESCE($8, club),
                position         = COALESCE($9, position),
                experience_years = COALESCE($10, experience_years),
                bio              = COALESCE($11, bio),
                profile_picture  = COALESCE($12, profile_picture),
                role             = COALESCE($13, role),
                updated_at       = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&patch.username)
            .bind(&patch.full_name)
            .bind(&patch.first_name)
            .bind(&patch.last_name)
            .bind(&patch.country)
            .bind(&patch.phone_number)
            .bind(&patch.club)
            .bind(&patch.position)
            .bind(patch.experience_years)
            .bind(&patch.bio)
            .bind(&patch.profile_picture)
            .bind(patch.parsed_role().map(|r| r.as_str()))
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;
        row.try_into()
    }
}
