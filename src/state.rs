use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{Argon2Hasher, CredentialHasher, JwtKeys, TokenVerifier};
use crate::config::AppConfig;
use crate::db;
use crate::users::{InMemoryUserRepository, PgUserRepository, UserRepository};

/// Ports shared by every request. Built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Connects to Postgres when `DATABASE_URL` is set, otherwise falls back
    /// to the in-memory store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let users: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, config.db_max_connections).await?;
                db::migrate(&pool).await;
                Arc::new(PgUserRepository::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory user store");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let tokens = Arc::new(JwtKeys::from_config(&config.jwt)) as Arc<dyn TokenVerifier>;

        Ok(Self::from_parts(config, users, Arc::new(Argon2Hasher), tokens))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            config,
            users,
            hasher,
            tokens,
        }
    }
}

impl FromRef<AppState> for Arc<dyn TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}
