//! User-management HTTP API: create, read, list, update and delete user
//! records behind a uniform JSON envelope, with bearer-gated mutations.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod response;
pub mod state;
pub mod users;

pub use app::{build_app, serve};
pub use config::AppConfig;
pub use state::AppState;
