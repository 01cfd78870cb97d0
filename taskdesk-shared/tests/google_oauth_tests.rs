/// Google OAuth adapter tests
///
/// Runs the real code exchange against a local axum server standing in for
/// Google's token and userinfo endpoints.

use std::collections::HashMap;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use taskdesk_shared::services::identity::{
    ExternalIdentity, GoogleOAuth, IdentityError, IdentityProvider,
};
use tokio::net::TcpListener;

const ACCESS_TOKEN: &str = "fake-access-token";

async fn token_ok(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let valid = form.get("code").map(String::as_str) == Some("good-code")
        && form.get("client_id").map(String::as_str) == Some("client-id")
        && form.get("client_secret").map(String::as_str) == Some("client-secret")
        && form.get("grant_type").map(String::as_str) == Some("authorization_code");

    if valid {
        (
            StatusCode::OK,
            Json(json!({ "access_token": ACCESS_TOKEN, "token_type": "Bearer" })),
        )
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
    }
}

async fn token_without_access_token() -> Json<Value> {
    Json(json!({ "token_type": "Bearer" }))
}

fn bearer_matches(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(&format!("Bearer {}", ACCESS_TOKEN)[..])
}

async fn userinfo_ok(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !bearer_matches(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_token" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "email": "grace@example.com", "name": "Grace Hopper" })),
    )
}

async fn userinfo_without_email(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !bearer_matches(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_token" })));
    }
    (StatusCode::OK, Json(json!({ "name": "No Email" })))
}

/// Starts the fake provider and returns its base URL
async fn fake_google() -> String {
    let app = Router::new()
        .route("/token", post(token_ok))
        .route("/token-empty", post(token_without_access_token))
        .route("/userinfo", get(userinfo_ok))
        .route("/userinfo-no-email", get(userinfo_without_email));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn google(base: &str, token_path: &str, userinfo_path: &str) -> GoogleOAuth {
    GoogleOAuth::new(
        "client-id",
        "client-secret",
        "http://localhost:8002/auth/google/callback",
    )
    .with_endpoints(
        format!("{}/auth", base),
        format!("{}{}", base, token_path),
        format!("{}{}", base, userinfo_path),
    )
}

#[tokio::test]
async fn test_exchange_resolves_profile() {
    let base = fake_google().await;
    let provider = google(&base, "/token", "/userinfo");

    let identity = provider.exchange_code("good-code").await.unwrap();
    assert_eq!(
        identity,
        ExternalIdentity {
            email: "grace@example.com".to_string(),
            name: "Grace Hopper".to_string(),
        }
    );

    let auth_url = provider.authorization_url().unwrap();
    assert!(auth_url.starts_with(&format!("{}/auth?", base)));
}

#[tokio::test]
async fn test_rejected_code_fails_exchange() {
    let base = fake_google().await;
    let provider = google(&base, "/token", "/userinfo");

    let err = provider.exchange_code("bad-code").await.unwrap_err();
    assert!(matches!(err, IdentityError::ExchangeFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_token_response_without_access_token_fails() {
    let base = fake_google().await;
    let provider = google(&base, "/token-empty", "/userinfo");

    let err = provider.exchange_code("good-code").await.unwrap_err();
    assert!(matches!(err, IdentityError::ExchangeFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_profile_without_email_fails() {
    let base = fake_google().await;
    let provider = google(&base, "/token", "/userinfo-no-email");

    let err = provider.exchange_code("good-code").await.unwrap_err();
    assert!(matches!(err, IdentityError::ExchangeFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_provider_is_upstream_failure() {
    // Grab a free port, then close it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = google(&format!("http://{}", addr), "/token", "/userinfo");

    let err = provider.exchange_code("good-code").await.unwrap_err();
    assert!(matches!(err, IdentityError::Upstream(_)), "got {:?}", err);
}
