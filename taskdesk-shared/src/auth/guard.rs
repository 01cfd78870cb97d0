/// Authorization guard
///
/// The single gate in front of every protected operation: verifies a session
/// token and resolves it to a live, fully set up account. It only reads.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_shared::auth::{guard::AuthGuard, jwt::TokenService};
/// use taskdesk_shared::store::MemoryStore;
///
/// # async fn example(raw: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
/// let guard = AuthGuard::new(
///     Arc::new(MemoryStore::new()),
///     TokenService::new("a-secret-of-at-least-thirty-two-bytes!"),
/// );
/// let user = guard.authenticate(raw).await?;
/// println!("request from {}", user.email);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use super::jwt::{JwtError, TokenService};
use crate::models::user::User;
use crate::store::{Store, StoreError};

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    /// A valid token issued for something other than a session
    #[error("Token cannot be used for this request")]
    WrongPurpose,

    /// The token outlived its account
    #[error("User not found")]
    UserNotFound,

    #[error("Account setup is not complete")]
    AccountIncomplete,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JwtError> for GuardError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => GuardError::TokenExpired,
            JwtError::WrongPurpose { .. } => GuardError::WrongPurpose,
            JwtError::Invalid(_) | JwtError::CreateError(_) => GuardError::TokenInvalid,
        }
    }
}

/// Resolves bearer tokens to users
#[derive(Clone)]
pub struct AuthGuard {
    store: Arc<dyn Store>,
    tokens: TokenService,
}

impl AuthGuard {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    /// Verifies `raw_token` and loads its user
    ///
    /// Blank tokens count as missing.
    pub async fn authenticate(&self, raw_token: Option<&str>) -> Result<User, GuardError> {
        let token = raw_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GuardError::MissingToken)?;

        let claims = self.tokens.verify_session(token)?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(GuardError::UserNotFound)?;

        if user.is_incomplete() {
            return Err(GuardError::AccountIncomplete);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::{Claims, TokenPurpose};
    use crate::models::user::NewUser;
    use crate::store::{CredentialStore, MemoryStore};

    const SECRET: &str = "guard-test-secret-at-least-32-bytes!";

    async fn setup() -> (AuthGuard, Arc<MemoryStore>, TokenService) {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new(SECRET);
        let guard = AuthGuard::new(store.clone(), tokens.clone());
        (guard, store, tokens)
    }

    #[tokio::test]
    async fn test_valid_session_resolves_user() {
        let (guard, store, tokens) = setup().await;
        let user = store
            .insert(NewUser::local("Ada", "ada@example.com", None, "hash".to_string()))
            .await
            .unwrap();

        let token = tokens.issue_session(user.id, &user.email).unwrap();
        let resolved = guard.authenticate(Some(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_missing_or_blank_token() {
        let (guard, _, _) = setup().await;
        assert!(matches!(guard.authenticate(None).await, Err(GuardError::MissingToken)));
        assert!(matches!(guard.authenticate(Some("  ")).await, Err(GuardError::MissingToken)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let (guard, _, _) = setup().await;
        assert!(matches!(
            guard.authenticate(Some("garbage")).await,
            Err(GuardError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (guard, store, tokens) = setup().await;
        let user = store
            .insert(NewUser::local("Ada", "ada@example.com", None, "hash".to_string()))
            .await
            .unwrap();

        let claims = Claims::with_expiration(user.id, &user.email, TokenPurpose::Session, Duration::seconds(-60));
        let token = tokens.issue(&claims).unwrap();

        assert!(matches!(guard.authenticate(Some(&token)).await, Err(GuardError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_token_outliving_account() {
        let (guard, _, tokens) = setup().await;
        let token = tokens.issue_session(Uuid::new_v4(), "gone@example.com").unwrap();

        assert!(matches!(guard.authenticate(Some(&token)).await, Err(GuardError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_completion_token_and_incomplete_account_rejected() {
        let (guard, store, tokens) = setup().await;
        let pending = store
            .insert(NewUser::google_provisional("Grace", "grace@example.com"))
            .await
            .unwrap();

        let completion = tokens.issue_account_completion(pending.id, &pending.email).unwrap();
        assert!(matches!(
            guard.authenticate(Some(&completion)).await,
            Err(GuardError::WrongPurpose)
        ));

        let session = tokens.issue_session(pending.id, &pending.email).unwrap();
        assert!(matches!(
            guard.authenticate(Some(&session)).await,
            Err(GuardError::AccountIncomplete)
        ));
    }
}
