use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::jwt::TokenVerifier;
use crate::error::AppError;

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// Authenticated caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Pulls the token out of an `Authorization` header value. The scheme is
/// matched case-insensitively; an empty token counts as missing.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn TokenVerifier>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("Not authenticated".into()))?;

        let token = bearer_token(header)
            .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.into()))?;

        let verifier = <Arc<dyn TokenVerifier> as FromRef<S>>::from_ref(state);
        match verifier.verify(token).await {
            Ok(subject) => Ok(AuthUser(subject)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::Unauthenticated(INVALID_CREDENTIALS.into()))
            }
        }
    }
}
