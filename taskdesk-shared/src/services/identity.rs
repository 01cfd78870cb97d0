/// Google sign-in and account linking
///
/// The provider exchanges an authorization code for an access token, uses it
/// once to fetch the profile, and drops it. The profile email is then linked
/// to a local account:
///
/// - active account with that email: sign in
/// - no account: create a provisional Google account and ask the user to
///   complete it
/// - provisional account that was never completed: ask again
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_shared::auth::jwt::TokenService;
/// use taskdesk_shared::services::identity::{GoogleOAuth, IdentityService};
/// use taskdesk_shared::store::MemoryStore;
///
/// # async fn example(code: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let google = GoogleOAuth::new("client-id", "client-secret", "http://localhost:8002/auth/google/callback");
/// let identity = IdentityService::new(
///     Arc::new(MemoryStore::new()),
///     TokenService::new("a-secret-of-at-least-thirty-two-bytes!"),
///     Some(Arc::new(google)),
/// );
///
/// let outcome = identity.login_with_code(code).await?;
/// println!("redirect to {}", outcome.redirect_url("http://localhost:3000")?);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::auth::jwt::{JwtError, TokenService};
use crate::models::user::{NewUser, User};
use crate::store::{Store, StoreError};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Error type for external sign-in
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Google sign-in is not configured")]
    NotConfigured,

    /// The provider answered but gave no usable token or email
    #[error("Identity exchange failed: {0}")]
    ExchangeFailed(String),

    /// The provider could not be reached or answered with an error status
    #[error("Identity provider error: {0}")]
    Upstream(String),

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Upstream(err.to_string())
    }
}

/// Profile returned by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
}

/// An OAuth provider that can verify who a user is
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start sign-in
    fn authorization_url(&self) -> Result<String, IdentityError>;

    /// Turns an authorization code into a verified identity
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityError>;
}

/// Google OAuth 2.0 web flow
#[derive(Debug, Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    name: Option<String>,
}

impl GoogleOAuth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }

    /// Points the flow at other endpoints, e.g. a local fake
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn authorization_url(&self) -> Result<String, IdentityError> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", "openid email profile"),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| IdentityError::InvalidRedirect(e.to_string()))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityError> {
        let token: TokenResponse = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| IdentityError::ExchangeFailed("Failed to get access token".to_string()))?;

        let info: UserInfo = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        identity_from_profile(info)
    }
}

fn identity_from_profile(info: UserInfo) -> Result<ExternalIdentity, IdentityError> {
    let email = info
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| IdentityError::ExchangeFailed("Profile has no email".to_string()))?;

    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(ExternalIdentity { email, name })
}

/// Where the browser goes after a successful callback
#[derive(Debug, Clone)]
pub enum OAuthOutcome {
    /// Existing, active account
    Login { token: String, user: User },

    /// Provisional account that still needs a user id and password
    CompleteAccount { email: String, completion_token: String },
}

impl OAuthOutcome {
    /// Frontend URL for this outcome
    pub fn redirect_url(&self, frontend_url: &str) -> Result<String, IdentityError> {
        let base = frontend_url.trim_end_matches('/');

        let url = match self {
            OAuthOutcome::Login { token, .. } => {
                Url::parse_with_params(&format!("{}/dashboard", base), &[("token", token)])
            }
            OAuthOutcome::CompleteAccount {
                email,
                completion_token,
            } => Url::parse_with_params(
                &format!("{}/complete-account", base),
                &[("email", email), ("token", completion_token)],
            ),
        }
        .map_err(|e| IdentityError::InvalidRedirect(e.to_string()))?;

        Ok(url.into())
    }
}

/// Links external identities to local accounts
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self {
            store,
            tokens,
            provider,
        }
    }

    fn provider(&self) -> Result<&dyn IdentityProvider, IdentityError> {
        self.provider.as_deref().ok_or(IdentityError::NotConfigured)
    }

    pub fn authorization_url(&self) -> Result<String, IdentityError> {
        self.provider()?.authorization_url()
    }

    /// Full callback: exchange the code, then link the identity
    pub async fn login_with_code(&self, code: &str) -> Result<OAuthOutcome, IdentityError> {
        let identity = self.provider()?.exchange_code(code).await?;
        self.complete_oauth_login(identity).await
    }

    /// Links a verified identity to a local account
    pub async fn complete_oauth_login(&self, identity: ExternalIdentity) -> Result<OAuthOutcome, IdentityError> {
        let user = match self.store.find_by_email(&identity.email).await? {
            Some(user) => user,
            None => self.provision(&identity).await?,
        };

        if user.is_incomplete() {
            let completion_token = self.tokens.issue_account_completion(user.id, &user.email)?;
            return Ok(OAuthOutcome::CompleteAccount {
                email: user.email,
                completion_token,
            });
        }

        tracing::info!(user_id = %user.id, "User signed in with Google");

        let token = self.tokens.issue_session(user.id, &user.email)?;
        Ok(OAuthOutcome::Login { token, user })
    }

    async fn provision(&self, identity: &ExternalIdentity) -> Result<User, IdentityError> {
        match self
            .store
            .insert(NewUser::google_provisional(&identity.name, &identity.email))
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Provisional Google account created");
                Ok(user)
            }
            // A concurrent callback for the same email won the insert
            Err(StoreError::Conflict(_)) => self
                .store
                .find_by_email(&identity.email)
                .await?
                .ok_or_else(|| StoreError::NotFound(identity.email.clone()).into()),
            Err(e) => Err(e.into()),
        }
    }
}
