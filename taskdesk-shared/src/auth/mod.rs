/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the minimum length rule
/// - [`jwt`]: HS256 session and account-completion tokens
/// - [`otp`]: six-digit password-reset codes
/// - [`guard`]: token to user resolution for protected requests
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
/// use taskdesk_shared::auth::jwt::TokenService;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let tokens = TokenService::new("a-secret-of-at-least-thirty-two-bytes!");
/// let token = tokens.issue_session(Uuid::new_v4(), "ada@example.com")?;
/// # Ok(())
/// # }
/// ```

pub mod guard;
pub mod jwt;
pub mod otp;
pub mod password;
