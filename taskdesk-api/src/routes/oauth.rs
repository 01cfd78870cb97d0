/// Google sign-in endpoints
///
/// # Endpoints
///
/// - `GET /auth/google` - Redirect to Google's consent screen
/// - `GET /auth/google/callback?code=...` - Finish sign-in and redirect to the frontend
///
/// The callback lands the browser on one of:
///
/// ```text
/// {FRONTEND_URL}/dashboard?token=<session token>
/// {FRONTEND_URL}/complete-account?email=<email>&token=<completion token>
/// ```

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Query string Google appends to the callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,

    /// Set instead of `code` when the user declined
    pub error: Option<String>,
}

pub async fn google_login(State(state): State<AppState>) -> ApiResult<Redirect> {
    let url = state.identity.authorization_url()?;
    Ok(Redirect::to(&url))
}

pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Redirect> {
    if let Some(error) = query.error {
        return Err(ApiError::BadRequest(format!("Google sign-in was not completed: {}", error)));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let outcome = state.identity.login_with_code(&code).await?;
    let url = outcome.redirect_url(&state.config.frontend_url)?;

    Ok(Redirect::to(&url))
}
