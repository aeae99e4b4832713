use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo::{RepoError, RepoResult, UserRepository};
use crate::users::repo_types::{ListFilter, NewUserRecord, UserChanges, UserRecord};

const USER_COLUMNS: &str =
    "id, email, username, full_name, is_active, hashed_password, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps unique violations on `users` to `RepoError::Duplicate`.
fn map_write_error(err: sqlx::Error, what: &'static str) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => "username",
                _ => "email",
            };
            return RepoError::Duplicate { field };
        }
    }
    RepoError::Backend(anyhow::Error::new(err).context(what))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn list_filtered(&self, filter: ListFilter) -> RepoResult<(Vec<UserRecord>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
              FROM users
             WHERE ($1::boolean IS NULL OR is_active = $1)
            "#,
        )
        .bind(filter.is_active)
        .fetch_one(&self.db)
        .await
        .context("count users")?;

        let rows = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE ($1::boolean IS NULL OR is_active = $1)
             ORDER BY id ASC
             LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.is_active)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&self.db)
        .await
        .context("list users")?;

        Ok((rows, total))
    }

    async fn insert(&self, user: NewUserRecord) -> RepoResult<UserRecord> {
        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, username, full_name, is_active, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(user.is_active)
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_error(e, "insert user"))
    }

    async fn update(&self, id: i64, changes: UserChanges) -> RepoResult<Option<UserRecord>> {
        let (set_full_name, full_name) = match changes.full_name {
            Some(v) => (true, v),
            None => (false, None),
        };

        sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   username = COALESCE($3, username),
                   full_name = CASE WHEN $4 THEN $5 ELSE full_name END,
                   is_active = COALESCE($6, is_active),
                   updated_at = $7
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.username)
        .bind(set_full_name)
        .bind(full_name)
        .bind(changes.is_active)
        .bind(changes.updated_at)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_write_error(e, "update user"))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(result.rows_affected() > 0)
    }
}
