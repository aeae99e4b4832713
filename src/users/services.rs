use std::sync::Arc;

use axum::extract::FromRef;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::auth::CredentialHasher;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::dto::{UserCreate, UserUpdate};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{ListFilter, NewUserRecord, User, UserChanges};

pub const USER_NOT_FOUND: &str = "User not found";
pub const EMAIL_TAKEN: &str = "User with this email already exists";

/// User business operations, independent of HTTP.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.hasher.clone())
    }
}

/// Next `updated_at`: now, but always strictly after `previous` at
/// microsecond precision.
fn next_timestamp(previous: OffsetDateTime) -> OffsetDateTime {
    OffsetDateTime::now_utc().max(previous + Duration::microseconds(1))
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }

    #[instrument(skip(self, input), fields(email = %input.email, username = %input.username))]
    pub async fn create(&self, input: UserCreate) -> AppResult<User> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }

        let hashed_password = self.hasher.hash(&input.password).await?;
        let now = OffsetDateTime::now_utc();
        let record = self
            .users
            .insert(NewUserRecord {
                email: input.email,
                username: input.username,
                full_name: input.full_name,
                is_active: input.is_active,
                hashed_password,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(user_id = record.id, "user created");
        Ok(record.into())
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    #[instrument(skip(self))]
    pub async fn get_by_email(&self, email: &str) -> AppResult<User> {
        self.users
            .find_by_email(email.trim())
            .await?
            .map(User::from)
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ListFilter) -> AppResult<(Vec<User>, i64)> {
        let (records, total) = self.users.list_filtered(filter).await?;
        Ok((records.into_iter().map(User::from).collect(), total))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: UserUpdate) -> AppResult<User> {
        let existing = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        let changes = UserChanges {
            email: input.email,
            username: input.username,
            full_name: input.full_name.into_change(),
            is_active: input.is_active,
            updated_at: next_timestamp(existing.updated_at),
        };

        let record = self
            .users
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;

        info!(user_id = id, "user updated");
        Ok(record.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if self.users.find_by_id(id).await?.is_none() {
            return Err(AppError::not_found(USER_NOT_FOUND));
        }
        if !self.users.delete(id).await? {
            return Err(AppError::not_found(USER_NOT_FOUND));
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }
}
