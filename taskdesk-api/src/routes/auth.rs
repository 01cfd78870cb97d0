/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register a local account and sign in
/// - `POST /auth/login` - Sign in with email or user id
/// - `POST /auth/change-password` - Change password (authenticated)
/// - `POST /auth/forgot-password` - Mail a reset code
/// - `POST /auth/reset-password` - Set a new password with a reset code
/// - `POST /auth/complete-account` - Finish an account created by Google sign-in

use crate::{
    app::AppState,
    error::ApiResult,
    middleware::auth::CurrentUser,
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskdesk_shared::services::accounts::{AuthSession, Registration};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    /// Email address
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,

    /// Optional login name usable in place of the email
    #[validate(length(min = 3, max = 100, message = "User ID must be between 3 and 100 characters"))]
    pub user_id: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address or user id
    #[validate(length(min = 1, message = "Email or user ID is required"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    pub otp: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteAccountRequest {
    /// Account-completion token from the Google sign-in redirect
    pub token: String,

    #[validate(length(min = 3, max = 100, message = "User ID must be between 3 and 100 characters"))]
    pub user_id: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

/// Register a new user
///
/// ```text
/// POST /auth/register
/// { "name": "Ada", "email": "ada@example.com", "password": "secret1", "user_id": "ada" }
/// ```
///
/// Responds `201 Created` with `{ "token": "eyJ...", "user": { ... } }`.
///
/// # Errors
///
/// - `409 Conflict`: Email or user id already taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    req.validate()?;

    let session = state
        .accounts
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
            user_id: req.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login endpoint
///
/// ```text
/// POST /auth/login
/// { "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// The `email` field also accepts the account's user id.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    req.validate()?;

    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: Current password is incorrect
pub async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .accounts
        .change_password(user.id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// Mail a six-digit reset code
///
/// # Errors
///
/// - `403 Forbidden`: Google account that has not been completed
/// - `404 Not Found`: No account has this email
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state.reset.request(req.email.trim()).await?;
    Ok(Json(MessageResponse::new("OTP sent to email")))
}

/// Replace the password using a reset code
///
/// # Errors
///
/// - `400 Bad Request`: Wrong, expired, spent or locked-out code
/// - `403 Forbidden`: Google account that has not been completed
/// - `404 Not Found`: No account has this email
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .reset
        .confirm(req.email.trim(), req.otp.trim(), &req.new_password)
        .await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}

/// Set user id and password on an account created by Google sign-in
///
/// # Errors
///
/// - `400 Bad Request`: Account is already active
/// - `401 Unauthorized`: Missing, expired or non-completion token
/// - `409 Conflict`: User id taken by another account
pub async fn complete_account(
    State(state): State<AppState>,
    Json(req): Json<CompleteAccountRequest>,
) -> ApiResult<Json<AuthSession>> {
    req.validate()?;

    let session = state
        .accounts
        .complete_account(&req.token, &req.user_id, &req.password)
        .await?;

    Ok(Json(session))
}
