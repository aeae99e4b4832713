use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AppError;
use crate::users::repo_types::{ListFilter, NewUserRecord, UserChanges, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique column (`email` or `username`) is already taken.
    #[error("duplicate {field}")]
    Duplicate { field: &'static str },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { field } => {
                AppError::Conflict(format!("User with this {field} already exists"))
            }
            RepoError::Backend(e) => AppError::Internal(e),
        }
    }
}

/// Storage port for users.
///
/// Implementations must enforce email and username uniqueness atomically at
/// insert and update time, and must never reuse an id.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRecord>>;

    /// Returns the `[skip, skip + limit)` window of matching records in id
    /// order, plus the number of all matching records.
    async fn list_filtered(&self, filter: ListFilter) -> RepoResult<(Vec<UserRecord>, i64)>;

    async fn insert(&self, user: NewUserRecord) -> RepoResult<UserRecord>;

    /// `Ok(None)` when no record has this id.
    async fn update(&self, id: i64, changes: UserChanges) -> RepoResult<Option<UserRecord>>;

    /// `Ok(false)` when no record has this id.
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, UserRecord>,
    last_id: i64,
}

/// Same folding as Postgres `lower()`, so both stores agree on uniqueness.
fn email_key(email: &str) -> String {
    email.to_lowercase()
}

impl Table {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        let key = email_key(email);
        self.rows
            .values()
            .any(|r| Some(r.id) != except && email_key(&r.email) == key)
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|r| Some(r.id) != except && r.username == username)
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let key = email_key(email);
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|r| email_key(&r.email) == key)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRecord>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list_filtered(&self, filter: ListFilter) -> RepoResult<(Vec<UserRecord>, i64)> {
        let table = self.table.read().await;
        let matching = table.rows.values().filter(|r| filter.matches(r));
        let total = matching.clone().count() as i64;
        let items = matching
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn insert(&self, user: NewUserRecord) -> RepoResult<UserRecord> {
        let mut table = self.table.write().await;
        if table.email_taken(&user.email, None) {
            return Err(RepoError::Duplicate { field: "email" });
        }
        if table.username_taken(&user.username, None) {
            return Err(RepoError::Duplicate { field: "username" });
        }

        table.last_id += 1;
        let record = UserRecord {
            id: table.last_id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            is_active: user.is_active,
            hashed_password: user.hashed_password,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        table.rows.insert(record.id, record.clone());
        debug!(user_id = record.id, "user inserted");
        Ok(record)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> RepoResult<Option<UserRecord>> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if table.email_taken(email, Some(id)) {
                return Err(RepoError::Duplicate { field: "email" });
            }
        }
        if let Some(username) = &changes.username {
            if table.username_taken(username, Some(id)) {
                return Err(RepoError::Duplicate { field: "username" });
            }
        }

        let Some(record) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            record.email = email;
        }
        if let Some(username) = changes.username {
            record.username = username;
        }
        if let Some(full_name) = changes.full_name {
            record.full_name = full_name;
        }
        if let Some(is_active) = changes.is_active {
            record.is_active = is_active;
        }
        record.updated_at = changes.updated_at;
        debug!(user_id = id, "user updated");
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let removed = self.table.write().await.rows.remove(&id).is_some();
        if removed {
            debug!(user_id = id, "user deleted");
        }
        Ok(removed)
    }
}
