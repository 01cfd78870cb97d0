/// Password reset by emailed one-time code

mod common;

use axum::http::StatusCode;
use common::{otp_from, TestContext};
use serde_json::json;

#[tokio::test]
async fn test_reset_round_trip() {
    let ctx = TestContext::new();
    ctx.register("Ada", "a@x.com", "oldpass").await;

    let (status, body) = ctx
        .post("/auth/forgot-password", None, json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP sent to email");

    let sent = ctx.wait_for_mail(1).await;
    assert_eq!(sent[0].to, "a@x.com");
    assert_eq!(sent[0].subject, "Password Reset OTP");
    let otp = otp_from(&sent[0]);
    assert_eq!(otp.len(), 6);

    let (status, body) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": otp, "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset successfully");

    let (status, _) = ctx
        .post("/auth/login", None, json!({ "email": "a@x.com", "password": "oldpass" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .post("/auth/login", None, json!({ "email": "a@x.com", "password": "newpass" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // The code is spent
    let (status, body) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": otp, "new_password": "another" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired OTP");
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post("/auth/forgot-password", None, json!({ "email": "nobody@x.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Email not found");
}

#[tokio::test]
async fn test_reset_unknown_email() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "nobody@x.com", "otp": "123456", "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_code_keeps_old_password() {
    let ctx = TestContext::new();
    ctx.register("Ada", "a@x.com", "oldpass").await;
    ctx.post("/auth/forgot-password", None, json!({ "email": "a@x.com" }))
        .await;
    let otp = otp_from(&ctx.wait_for_mail(1).await[0]);
    let wrong = if otp == "999999" { "100000" } else { "999999" };

    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": wrong, "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post("/auth/login", None, json!({ "email": "a@x.com", "password": "oldpass" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_short_new_password_rejected() {
    let ctx = TestContext::new();
    ctx.register("Ada", "a@x.com", "oldpass").await;
    ctx.post("/auth/forgot-password", None, json!({ "email": "a@x.com" }))
        .await;
    let otp = otp_from(&ctx.wait_for_mail(1).await[0]);

    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": otp, "new_password": "123" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Validation failures do not spend the code
    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": otp, "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let ctx = TestContext::new();
    ctx.register("Ada", "a@x.com", "oldpass").await;
    ctx.post("/auth/forgot-password", None, json!({ "email": "a@x.com" }))
        .await;
    let otp = otp_from(&ctx.wait_for_mail(1).await[0]);
    let wrong = if otp == "999999" { "100000" } else { "999999" };

    for _ in 0..5 {
        let (status, _) = ctx
            .post(
                "/auth/reset-password",
                None,
                json!({ "email": "a@x.com", "otp": wrong, "new_password": "newpass" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": otp, "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A fresh code lifts the lockout
    ctx.post("/auth/forgot-password", None, json!({ "email": "a@x.com" }))
        .await;
    let sent = ctx.wait_for_mail(2).await;
    let fresh = otp_from(&sent[1]);

    let (status, _) = ctx
        .post(
            "/auth/reset-password",
            None,
            json!({ "email": "a@x.com", "otp": fresh, "new_password": "newpass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
