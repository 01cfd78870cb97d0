//! Common test utilities for integration tests
//!
//! Builds the real router over the in-memory store with:
//! - a recording mailer, so tests can read reset codes and login mail
//! - a stub Google provider that maps authorization codes to identities
//! - helpers for JSON requests, registration and token minting

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::Config;
use taskdesk_shared::auth::jwt::TokenService;
use taskdesk_shared::mail::{MailDispatcher, OutboundEmail, RecordingMailer};
use taskdesk_shared::services::identity::{ExternalIdentity, IdentityError, IdentityProvider};
use taskdesk_shared::store::{MemoryStore, Store};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const FRONTEND_URL: &str = "http://localhost:3000";

/// Google stand-in: each known code yields a fixed identity
pub struct StubGoogle {
    identities: HashMap<String, ExternalIdentity>,
}

impl StubGoogle {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
        }
    }

    pub fn with_identity(mut self, code: &str, email: &str, name: &str) -> Self {
        self.identities.insert(
            code.to_string(),
            ExternalIdentity {
                email: email.to_string(),
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StubGoogle {
    fn authorization_url(&self) -> Result<String, IdentityError> {
        Ok("https://accounts.example.com/o/oauth2/auth?client_id=test-client".to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityError> {
        self.identities
            .get(code)
            .cloned()
            .ok_or_else(|| IdentityError::ExchangeFailed("Failed to get access token".to_string()))
    }
}

/// Registered test user
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: TokenService,
    shutdown: CancellationToken,
}

impl TestContext {
    /// Context with login mail off and Google sign-in configured
    pub fn new() -> Self {
        Self::build(false, Some(Arc::new(default_google())))
    }

    pub fn with_login_emails() -> Self {
        Self::build(true, Some(Arc::new(default_google())))
    }

    pub fn without_google() -> Self {
        Self::build(false, None)
    }

    pub fn build(send_login_emails: bool, google: Option<Arc<dyn IdentityProvider>>) -> Self {
        let mut vars = HashMap::new();
        vars.insert("STORE_BACKEND", "memory".to_string());
        vars.insert("JWT_SECRET", JWT_SECRET.to_string());
        vars.insert("FRONTEND_URL", FRONTEND_URL.to_string());
        vars.insert("SEND_LOGIN_EMAILS", send_login_emails.to_string());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        let shutdown = CancellationToken::new();
        let (mail, _worker) = MailDispatcher::spawn(mailer.clone(), shutdown.clone());

        let shared: Arc<dyn Store> = store.clone();
        let app = build_router(AppState::new(config, shared, mail, google));

        Self {
            app,
            store,
            mailer,
            tokens: TokenService::new(JWT_SECRET),
            shutdown,
        }
    }

    /// Sends a request and returns the raw response
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.expect("infallible router")
    }

    /// Sends a JSON request and returns status plus parsed body
    ///
    /// Empty or non-JSON bodies come back as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Registers a local account, panicking on failure
    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestUser {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({ "name": name, "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().expect("user id").to_string(),
            email: email.to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Creates a task as `owner`, returning the response body
    pub async fn create_task(&self, owner: &TestUser, body: Value) -> Value {
        let (status, task) = self.post("/tasks", Some(&owner.token), body).await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", task);
        task
    }

    /// Waits for the mail worker to deliver `count` messages
    pub async fn wait_for_mail(&self, count: usize) -> Vec<OutboundEmail> {
        self.mailer.wait_for(count, Duration::from_secs(2)).await
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn default_google() -> StubGoogle {
    StubGoogle::new()
        .with_identity("new-user-code", "grace@example.com", "Grace Hopper")
        .with_identity("existing-user-code", "ada@example.com", "Ada Lovelace")
}

/// Pulls the six-digit code out of a password reset mail
pub fn otp_from(mail: &OutboundEmail) -> String {
    mail.body
        .split("is: ")
        .nth(1)
        .map(|rest| rest.chars().take_while(|c| c.is_ascii_digit()).collect())
        .expect("reset mail carries a code")
}
