use std::fmt;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User row as stored. Never serialized to the API boundary.
#[derive(Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub hashed_password: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("is_active", &self.is_active)
            .field("hashed_password", &"[redacted]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Insert payload; the store assigns the id.
#[derive(Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub hashed_password: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Resolved update: `None` leaves a column untouched.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    /// `Some(None)` clears the column.
    pub full_name: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub skip: i64,
    pub limit: i64,
    pub is_active: Option<bool>,
}

impl ListFilter {
    pub fn matches(&self, record: &UserRecord) -> bool {
        self.is_active.map_or(true, |active| record.is_active == active)
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            email: r.email,
            username: r.username,
            full_name: r.full_name,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
