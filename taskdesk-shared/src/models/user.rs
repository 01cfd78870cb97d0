/// User model and database operations
///
/// This module provides the User model and the queries behind the credential
/// store. A user is either a local account (email + password) or an account
/// provisioned from Google sign-in, which starts out `incomplete` until the
/// owner picks a user id and password.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     user_id VARCHAR(100) UNIQUE,
///     password_hash VARCHAR(255),
///     auth_provider auth_provider NOT NULL DEFAULT 'local',
///     account_status account_status NOT NULL DEFAULT 'active',
///     reset_otp VARCHAR(6),
///     reset_otp_expires_at TIMESTAMPTZ,
///     reset_attempts INTEGER NOT NULL DEFAULT 0,
///     last_reset_attempt_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::user::{NewUser, User};
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(
///     &pool,
///     NewUser::local("Ada", "ada@example.com", None, "$argon2id$...".to_string()),
/// )
/// .await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Column list shared by every query returning a full user row
const USER_COLUMNS: &str = "id, name, email, user_id, password_hash, auth_provider, account_status, \
     reset_otp, reset_otp_expires_at, reset_attempts, last_reset_attempt_at, created_at, updated_at";

/// How the account authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email and password
    Local,

    /// Google sign-in
    Google,
}

/// Whether the account may be used for authenticated actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Fully set up
    Active,

    /// Provisioned from an external identity, still needs a user id and password
    Incomplete,
}

/// User account
///
/// Password hashes and reset codes never leave the server: they are skipped
/// when the user is serialized into a response.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Internal surrogate key
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique and case-sensitive as stored
    pub email: String,

    /// Optional external-facing user id (usable as a login name)
    pub user_id: Option<String>,

    /// Argon2id hash, absent for accounts that only used Google sign-in
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Authentication provider
    pub auth_provider: AuthProvider,

    /// Account status
    pub account_status: AccountStatus,

    /// Pending password-reset code
    #[serde(skip_serializing)]
    pub reset_otp: Option<String>,

    /// When the pending reset code stops being valid
    #[serde(skip_serializing)]
    pub reset_otp_expires_at: Option<DateTime<Utc>>,

    /// Failed reset attempts since the last code was issued
    #[serde(skip_serializing)]
    pub reset_attempts: i32,

    /// When the last reset code was requested
    #[serde(skip_serializing)]
    pub last_reset_attempt_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account still has to go through account completion
    pub fn is_incomplete(&self) -> bool {
        self.account_status == AccountStatus::Incomplete
    }

    /// Public projection used in task listings
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Minimal user projection embedded in task listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Input for creating a new user
///
/// Use the constructors so that a local account always carries a hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub user_id: Option<String>,
    pub password_hash: Option<String>,
    pub auth_provider: AuthProvider,
    pub account_status: AccountStatus,
}

impl NewUser {
    /// A local, active account
    pub fn local(
        name: impl Into<String>,
        email: impl Into<String>,
        user_id: Option<String>,
        password_hash: String,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            user_id,
            password_hash: Some(password_hash),
            auth_provider: AuthProvider::Local,
            account_status: AccountStatus::Active,
        }
    }

    /// A provisional account created from a Google identity
    pub fn google_provisional(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            user_id: None,
            password_hash: None,
            auth_provider: AuthProvider::Google,
            account_status: AccountStatus::Incomplete,
        }
    }
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the email or user id is taken.
    pub async fn create(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (name, email, user_id, password_hash, auth_provider, account_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.name)
            .bind(data.email)
            .bind(data.user_id)
            .bind(data.password_hash)
            .bind(data.auth_provider)
            .bind(data.account_status)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by internal id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (exact match)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by external-facing user id
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds every user whose email is in `emails`
    ///
    /// Unknown emails are simply absent from the result.
    pub async fn find_by_emails(pool: &PgPool, emails: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ANY($1) ORDER BY email");

        sqlx::query_as::<_, User>(&query)
            .bind(emails)
            .fetch_all(pool)
            .await
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stores a fresh reset code, zeroes the attempt counter and stamps the request time
    pub async fn set_reset_otp(
        pool: &PgPool,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_otp = $2,
                reset_otp_expires_at = $3,
                reset_attempts = 0,
                last_reset_attempt_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears any pending reset code
    pub async fn clear_reset_otp(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_otp = NULL, reset_otp_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Spends a reset code
    ///
    /// Sets the new hash and clears the code in one statement, guarded on the
    /// stored code still being `otp`. Returns false when the code was already
    /// spent or replaced in between.
    pub async fn consume_reset_otp(
        pool: &PgPool,
        id: Uuid,
        otp: &str,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_otp = NULL,
                reset_otp_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND reset_otp = $2
            "#,
        )
        .bind(id)
        .bind(otp)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bumps the failed reset attempt counter, returning the new count
    pub async fn record_failed_reset_attempt(pool: &PgPool, id: Uuid) -> Result<i32, sqlx::Error> {
        let (attempts,): (i32,) = sqlx::query_as(
            r#"
            UPDATE users
            SET reset_attempts = reset_attempts + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING reset_attempts
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(attempts)
    }

    /// Finishes setup of a provisional account
    pub async fn complete_account(
        pool: &PgPool,
        id: Uuid,
        user_id: &str,
        password_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET user_id = $2,
                password_hash = $3,
                account_status = 'active',
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(user_id)
            .bind(password_hash)
            .fetch_optional(pool)
            .await
    }
}
