/// Account lifecycle: registration, login, password change and completion of
/// accounts provisioned from Google sign-in.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::{JwtError, TokenService};
use crate::auth::password::{self, PasswordError};
use crate::mail::{MailDispatcher, OutboundEmail};
use crate::models::user::{NewUser, User};
use crate::store::{Store, StoreError};

/// Shortest external user id accepted
pub const MIN_USER_ID_LENGTH: usize = 3;

/// Error type for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),

    /// Email or external user id already in use
    #[error("{0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Account is already active")]
    AlreadyActive,

    /// Missing, expired or non-completion token at account completion
    #[error("Invalid or expired account completion token")]
    InvalidCompletionToken,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AccountError::Conflict(msg),
            other => AccountError::Store(other),
        }
    }
}

/// Token plus the user it was issued for
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_id: Option<String>,
}

/// Registration, login and credential changes
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    mail: MailDispatcher,
    send_login_emails: bool,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService, mail: MailDispatcher, send_login_emails: bool) -> Self {
        Self {
            store,
            tokens,
            mail,
            send_login_emails,
        }
    }

    /// Creates a local account and signs it in
    pub async fn register(&self, input: Registration) -> Result<AuthSession, AccountError> {
        let name = input.name.trim();
        let email = input.email.trim();
        if name.is_empty() {
            return Err(AccountError::InvalidInput("Name is required".to_string()));
        }
        if email.is_empty() {
            return Err(AccountError::InvalidInput("Email is required".to_string()));
        }
        password::validate_new_password(&input.password)?;

        let user_id = match input.user_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(id) => Some(validate_user_id(id)?.to_string()),
        };

        if self.store.find_by_email(email).await?.is_some() {
            return Err(AccountError::Conflict("Email already registered".to_string()));
        }
        if let Some(id) = user_id.as_deref() {
            if self.store.find_by_external_id(id).await?.is_some() {
                return Err(AccountError::Conflict("User ID is already taken".to_string()));
            }
        }

        let hash = password::hash_password(&input.password)?;
        let user = self.store.insert(NewUser::local(name, email, user_id, hash)).await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.session_for(user)
    }

    /// Signs in with an email or external user id
    ///
    /// Lookup tries the email first. Unknown identifiers and wrong passwords
    /// fail identically.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthSession, AccountError> {
        let identifier = identifier.trim();

        let user = match self.store.find_by_email(identifier).await? {
            Some(user) => Some(user),
            None => self.store.find_by_external_id(identifier).await?,
        };
        let user = user.ok_or(AccountError::InvalidCredentials)?;
        if user.is_incomplete() {
            tracing::debug!(user_id = %user.id, "Login rejected: account not completed");
            return Err(AccountError::InvalidCredentials);
        }

        // Accounts from Google sign-in have no password until completed
        let hash = user.password_hash.as_deref().ok_or(AccountError::InvalidCredentials)?;
        if !password::verify_password(password, hash)? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        if self.send_login_emails {
            self.mail
                .enqueue(OutboundEmail::login_notification(&user.email, &user.name));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.session_for(user)
    }

    /// Replaces the password after checking the current one
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        password::validate_new_password(new_password)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        let hash = user.password_hash.as_deref().ok_or(AccountError::IncorrectPassword)?;
        if !password::verify_password(current_password, hash)? {
            return Err(AccountError::IncorrectPassword);
        }

        let new_hash = password::hash_password(new_password)?;
        self.store.update_password(user.id, &new_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Finishes an account provisioned from Google sign-in
    ///
    /// `completion_token` must be an account-completion token; a session
    /// token is refused.
    pub async fn complete_account(
        &self,
        completion_token: &str,
        user_id: &str,
        new_password: &str,
    ) -> Result<AuthSession, AccountError> {
        let claims = self
            .tokens
            .verify_account_completion(completion_token)
            .map_err(|_| AccountError::InvalidCompletionToken)?;

        let user_id = validate_user_id(user_id.trim())?;
        password::validate_new_password(new_password)?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        if !user.is_incomplete() {
            return Err(AccountError::AlreadyActive);
        }

        if let Some(owner) = self.store.find_by_external_id(user_id).await? {
            if owner.id != user.id {
                return Err(AccountError::Conflict("User ID is already taken".to_string()));
            }
        }

        let hash = password::hash_password(new_password)?;
        let user = self.store.complete_account(user.id, user_id, &hash).await?;

        tracing::info!(user_id = %user.id, "Account completed");

        self.session_for(user)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, AccountError> {
        let token = self.tokens.issue_session(user.id, &user.email)?;
        Ok(AuthSession { token, user })
    }
}

fn validate_user_id(user_id: &str) -> Result<&str, AccountError> {
    if user_id.chars().count() < MIN_USER_ID_LENGTH {
        return Err(AccountError::InvalidInput(format!(
            "User ID must be at least {} characters long",
            MIN_USER_ID_LENGTH
        )));
    }
    Ok(user_id)
}
