use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::config::JwtConfig;

/// Token verifier port: maps a bearer token to the subject it was issued for.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> anyhow::Result<String>;
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}

/// HS256 signing and verification keys with issuer/audience expectations.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn sign_access(&self, subject: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject, "jwt signed");
        Ok(token)
    }

    pub fn decode(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(subject = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtKeys {
    async fn verify(&self, token: &str) -> anyhow::Result<String> {
        Ok(self.decode(token)?.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        }
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = JwtKeys::from_config(&config("test", "test-issuer"));
        let token = keys.sign_access("42").expect("sign access");
        let claims = keys.decode(&token).expect("decode token");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(keys.verify(&token).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn verify_rejects_wrong_issuer() {
        let good = JwtKeys::from_config(&config("test", "test-issuer"));
        let other = JwtKeys::from_config(&config("test", "someone-else"));
        let token = good.sign_access("42").expect("sign access");
        assert!(other.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret() {
        let good = JwtKeys::from_config(&config("test", "test-issuer"));
        let other = JwtKeys::from_config(&config("another-secret", "test-issuer"));
        let token = good.sign_access("42").expect("sign access");
        assert!(other.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn verify_rejects_garbage() {
        let keys = JwtKeys::from_config(&config("test", "test-issuer"));
        assert!(keys.verify("not.a.jwt").await.is_err());
    }
}
