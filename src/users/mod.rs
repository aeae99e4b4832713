pub mod dto;
pub mod handlers;
pub mod postgres;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

use crate::state::AppState;
use axum::{routing::MethodRouter, Router};

pub use postgres::PgUserRepository;
pub use repo::{InMemoryUserRepository, RepoError, UserRepository};
pub use repo_types::User;
pub use services::UserService;

/// Routes mounted under `/api/v1/users`.
pub fn router() -> Router<AppState> {
    handlers::user_routes()
}

/// List and create, for the `/api/v1/users/` spelling of the collection.
pub fn collection() -> MethodRouter<AppState> {
    handlers::collection_routes()
}
