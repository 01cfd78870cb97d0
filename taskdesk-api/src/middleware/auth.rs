/// Authentication middleware
///
/// Every protected route passes through [`require_user`]. The token is read
/// from the `Authorization: Bearer <token>` header or, when no header is
/// sent, from a `?token=` query parameter. The shared
/// [`AuthGuard`](taskdesk_shared::auth::guard::AuthGuard) verifies it and
/// loads the user, which is then added to the request extensions as
/// [`CurrentUser`].
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use taskdesk_api::middleware::auth::CurrentUser;
///
/// async fn handler(Extension(CurrentUser(user)): Extension<CurrentUser>) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use taskdesk_shared::models::user::User;

use crate::{app::AppState, error::ApiError};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Pulls the raw token out of a request
///
/// A present but non-Bearer `Authorization` header is an error rather than a
/// fall-through to the query string.
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Result<Option<String>, ApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Malformed authorization header".to_string()))?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;
        return Ok(Some(token.to_string()));
    }

    let token = Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token);
    Ok(token)
}

/// Rejects the request unless it carries a valid session token
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers(), req.uri())?;

    let user = state.guard.authenticate(token.as_deref()).await.map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Authentication failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
