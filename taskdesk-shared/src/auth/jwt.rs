/// Signed session tokens
///
/// Tokens are HS256 JWTs carrying the user's id and email. Two kinds exist,
/// told apart by the `purpose` claim:
///
/// - **Session** (7 days): presented on every authenticated request
/// - **Account completion** (30 minutes): only accepted by the account
///   completion endpoint after Google sign-in
///
/// Verification is strict: no clock leeway, and only HS256 is accepted, so a
/// token signed with any other algorithm fails even if its signature is valid.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::jwt::{Claims, TokenService};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new("a-secret-of-at-least-thirty-two-bytes!");
/// let user_id = Uuid::new_v4();
///
/// let token = tokens.issue(&Claims::session(user_id, "ada@example.com"))?;
/// let claims = tokens.verify_session(&token)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on and required of every token
pub const ISSUER: &str = "taskdesk";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    /// Bad signature, malformed token, wrong algorithm or wrong issuer
    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token was issued for {actual:?}, expected {expected:?}")]
    WrongPurpose {
        expected: TokenPurpose,
        actual: TokenPurpose,
    },
}

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    AccountCompletion,
}

impl TokenPurpose {
    /// Lifetime of a freshly issued token
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::Session => Duration::days(7),
            TokenPurpose::AccountCompletion => Duration::minutes(30),
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    pub email: String,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub purpose: TokenPurpose,
}

impl Claims {
    /// Claims with the default lifetime for `purpose`
    pub fn new(user_id: Uuid, email: impl Into<String>, purpose: TokenPurpose) -> Self {
        Self::with_expiration(user_id, email, purpose, purpose.lifetime())
    }

    pub fn session(user_id: Uuid, email: impl Into<String>) -> Self {
        Self::new(user_id, email, TokenPurpose::Session)
    }

    pub fn account_completion(user_id: Uuid, email: impl Into<String>) -> Self {
        Self::new(user_id, email, TokenPurpose::AccountCompletion)
    }

    /// Claims expiring `expires_in` from now. A negative duration yields an
    /// already expired token.
    pub fn with_expiration(
        user_id: Uuid,
        email: impl Into<String>,
        purpose: TokenPurpose,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            purpose,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, algorithm, issuer and expiry, and returns the claims
///
/// The purpose is not checked here; see [`TokenService::verify_session`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = 0;
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

/// Issues and verifies tokens with the process-wide secret
#[derive(Clone)]
pub struct TokenService {
    secret: String,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        create_token(claims, &self.secret)
    }

    /// Seven-day session token for a user
    pub fn issue_session(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        self.issue(&Claims::session(user_id, email))
    }

    /// Thirty-minute token that only unlocks account completion
    pub fn issue_account_completion(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        self.issue(&Claims::account_completion(user_id, email))
    }

    /// Verifies a token of any purpose
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        validate_token(token, &self.secret)
    }

    pub fn verify_session(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify_purpose(token, TokenPurpose::Session)
    }

    pub fn verify_account_completion(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify_purpose(token, TokenPurpose::AccountCompletion)
    }

    fn verify_purpose(&self, token: &str, expected: TokenPurpose) -> Result<Claims, JwtError> {
        let claims = self.verify(token)?;
        if claims.purpose != expected {
            return Err(JwtError::WrongPurpose {
                expected,
                actual: claims.purpose,
            });
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_purpose_lifetimes() {
        assert_eq!(TokenPurpose::Session.lifetime(), Duration::days(7));
        assert_eq!(TokenPurpose::AccountCompletion.lifetime(), Duration::minutes(30));
    }

    #[test]
    fn test_session_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::session(user_id, "ada@example.com");

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.purpose, TokenPurpose::Session);
        assert_eq!(claims.exp - claims.iat, Duration::days(7).num_seconds());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = TokenService::new(SECRET);
        let user_id = Uuid::new_v4();

        let token = tokens.issue_session(user_id, "ada@example.com").unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token(&Claims::session(Uuid::new_v4(), "a@x.com"), SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_corrupted_signature_is_invalid() {
        let claims = Claims::session(Uuid::new_v4(), "a@x.com");
        let good = create_token(&claims, SECRET).unwrap();
        let other = create_token(&claims, "some-other-secret-of-32-bytes-or-more").unwrap();

        // Keep header and payload, swap in a signature made with another key
        let (body, _) = good.rsplit_once('.').unwrap();
        let (_, foreign_sig) = other.rsplit_once('.').unwrap();
        let tampered = format!("{}.{}", body, foreign_sig);

        assert!(matches!(validate_token(&tampered, SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        assert!(matches!(validate_token("not.a.jwt", SECRET), Err(JwtError::Invalid(_))));
        assert!(matches!(validate_token("", SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "a@x.com",
            TokenPurpose::Session,
            Duration::seconds(-3600),
        );
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_just_expired_token_gets_no_leeway() {
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "a@x.com",
            TokenPurpose::Session,
            Duration::seconds(-2),
        );
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims::session(Uuid::new_v4(), "a@x.com");
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let mut claims = Claims::session(Uuid::new_v4(), "a@x.com");
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_purpose_checks() {
        let tokens = TokenService::new(SECRET);
        let user_id = Uuid::new_v4();

        let session = tokens.issue_session(user_id, "a@x.com").unwrap();
        let completion = tokens.issue_account_completion(user_id, "a@x.com").unwrap();

        assert!(tokens.verify_session(&session).is_ok());
        assert!(tokens.verify_account_completion(&completion).is_ok());

        assert!(matches!(
            tokens.verify_session(&completion),
            Err(JwtError::WrongPurpose { expected: TokenPurpose::Session, .. })
        ));
        assert!(matches!(
            tokens.verify_account_completion(&session),
            Err(JwtError::WrongPurpose { expected: TokenPurpose::AccountCompletion, .. })
        ));
    }
}
