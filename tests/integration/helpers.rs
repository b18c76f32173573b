//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use esim_auth::JwtEncoder;
use esim_core::config::{AppConfig, DatabaseProvider};
use esim_database::{MemoryStore, Repositories};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Test application context over the in-memory store.
pub struct TestApp {
    /// The full Axum application
    pub router: Router,
    /// Backing store, for seeding and direct assertions
    pub store: Arc<MemoryStore>,
    /// Token minter sharing the app's secret
    pub encoder: JwtEncoder,
    _dir: tempfile::TempDir,
}

/// An identity with a ready-made bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.auth.jwt_secret = TEST_SECRET.to_string();
        config.database.provider = DatabaseProvider::Memory;
        config.storage.thumbnail_dir = dir.path().join("thumbnails").display().to_string();

        let store = Arc::new(MemoryStore::new());
        let repos = Repositories::memory(Arc::clone(&store));
        let encoder = JwtEncoder::new(&config.auth);

        let state = esim_api::AppState::new(config, repos, None);
        let router = esim_api::build_app(state);

        Self {
            router,
            store,
            encoder,
            _dir: dir,
        }
    }

    /// Mint a token for a fresh user id.
    pub fn user(&self, username: &str) -> TestUser {
        let id = Uuid::new_v4();
        let (token, _) = self
            .encoder
            .generate_access_token(id, username)
            .expect("Failed to mint token");
        TestUser {
            id,
            username: username.to_string(),
            token,
        }
    }

    /// Create a save and return the `data` object of the response.
    pub async fn create_save(&self, user: &TestUser, body: Value) -> Value {
        let response = self
            .request("POST", "/api/state", Some(body), Some(&user.token))
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "Create failed: {:?}",
            response.body
        );
        response.data().clone()
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// The `error` code of an error body.
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
