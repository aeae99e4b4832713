#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use user_api::{
    auth::{CredentialHasher, JwtKeys, TokenVerifier},
    config::JwtConfig,
    users::InMemoryUserRepository,
    build_app, AppConfig, AppState,
};

/// Keeps tests fast; argon2 is covered by its own unit tests.
pub struct PrefixHasher;

#[async_trait]
impl CredentialHasher for PrefixHasher {
    async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        Ok(format!("hashed_{plain}"))
    }
}

/// Fails every call with an error that names an internal host.
pub struct BrokenHasher;

#[async_trait]
impl CredentialHasher for BrokenHasher {
    async fn hash(&self, _plain: &str) -> anyhow::Result<String> {
        anyhow::bail!("hashing backend unreachable at 10.0.0.3")
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        app_name: "test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        database_url: None,
        db_max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        },
        allowed_origins: vec!["http://localhost:3000".into()],
        fly_app_name: String::new(),
        fly_region: String::new(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub keys: JwtKeys,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_hasher(Arc::new(PrefixHasher))
    }

    pub fn with_hasher(hasher: Arc<dyn CredentialHasher>) -> Self {
        let config = test_config();
        let keys = JwtKeys::from_config(&config.jwt);
        let state = AppState::from_parts(
            Arc::new(config),
            Arc::new(InMemoryUserRepository::new()),
            hasher,
            Arc::new(keys.clone()) as Arc<dyn TokenVerifier>,
        );
        Self {
            router: build_app(state),
            keys,
        }
    }

    pub fn token(&self) -> String {
        self.keys.sign_access("tester").expect("sign token")
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send_raw(req).await;
        (status, body)
    }

    pub async fn send_raw(
        &self,
        req: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    pub async fn create(&self, email: &str, username: &str) -> Value {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/v1/users",
                serde_json::json!({
                    "user": { "email": email, "username": username, "password": "longenough" }
                }),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"].clone()
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}
