#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use restaurant_backend::{
    api::{build_router, AppState},
    auth::{
        models::Role,
        user_store::NewUser,
        PasswordHasher,
    },
    config::Config,
    middleware::RateLimitConfig,
    store::Database,
};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        secret_key: Some("integration-test-secret-key-0123456789".to_string()),
        rate_limit: RateLimitConfig {
            max_requests: 1_000,
            window: Duration::from_secs(60),
            burst: 0,
        },
        ..Config::default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config())
}

pub fn spawn_app_with(config: Config) -> TestApp {
    let db = Database::open_in_memory().expect("in-memory database");
    let state = AppState::new(db, &config).expect("app state");
    TestApp {
        router: build_router(state.clone(), &config),
        state,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a customer and return its access token.
    pub async fn register_customer(&self, username: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Insert an admin straight through the user store, then log in.
    pub async fn admin_token(&self) -> String {
        let password_hash = PasswordHasher::new(4).hash_secret("admin-pw").unwrap();
        self.state
            .users
            .insert(NewUser {
                username: "root".to_string(),
                email: "root@x.com".to_string(),
                full_name: Some("Root Admin".to_string()),
                password_hash,
                role: Role::Admin,
            })
            .await
            .unwrap();

        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": "root@x.com", "password": "admin-pw" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}
