//! Common test utilities for FLG service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use flg_core::UserId;
use flg_service::{create_router, AppState, ServiceConfig};
use flg_store::MemoryStore;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const AUDIENCE: &str = "flg";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for fault injection.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            auth_jwt_secret: Some(JWT_SECRET.into()),
            auth_audience: AUDIENCE.into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), config);
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
        }
    }

    /// Authorization header for the test user.
    pub fn user_auth(&self) -> (HeaderName, HeaderValue) {
        bearer(&token_for(self.test_user_id.as_str(), AUDIENCE, JWT_SECRET))
    }

    /// Authorization header for a fresh, unrelated user.
    pub fn other_user_auth() -> (HeaderName, HeaderValue) {
        bearer(&token_for(
            UserId::generate().as_str(),
            AUDIENCE,
            JWT_SECRET,
        ))
    }

    /// Open an account for the test user.
    pub async fn open_account(&self, username: &str) {
        let (name, value) = self.user_auth();
        self.server
            .post("/v1/accounts")
            .add_header(name, value)
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    /// Buy credits for the test user.
    pub async fn purchase(&self, amount: i64) {
        let (name, value) = self.user_auth();
        self.server
            .post("/v1/credits/purchase")
            .add_header(name, value)
            .json(&json!({ "amount": amount }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint a signed token valid for one hour.
pub fn token_for(sub: &str, audience: &str, secret: &str) -> String {
    let claims = json!({
        "sub": sub,
        "aud": audience,
        "iat": chrono::Utc::now().timestamp(),
        "exp": chrono::Utc::now().timestamp() + 3600,
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Build a bearer authorization header.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid header value"),
    )
}
