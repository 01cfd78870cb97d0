/// Password reset by emailed one-time code
///
/// `request` stores a fresh six-digit code on the account and mails it.
/// `confirm` spends the code: the new hash is written and the code cleared in
/// one store operation, so a code can never be used twice.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::otp::{generate_otp, otp_accepts, otp_expiry, MAX_RESET_ATTEMPTS};
use crate::auth::password::{self, PasswordError};
use crate::mail::{MailDispatcher, OutboundEmail};
use crate::store::{Store, StoreError};

/// Error type for password reset
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Email not found")]
    EmailNotFound,

    /// Provisional Google account; it gets a password through account completion
    #[error("Account setup is not complete")]
    AccountIncomplete,

    /// Wrong, expired, spent or locked-out code
    #[error("Invalid or expired OTP")]
    OtpInvalid,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ResetService {
    store: Arc<dyn Store>,
    mail: MailDispatcher,
}

impl ResetService {
    pub fn new(store: Arc<dyn Store>, mail: MailDispatcher) -> Self {
        Self { store, mail }
    }

    /// Issues a reset code for `email` and queues it for delivery
    ///
    /// Any earlier code for the account stops working.
    pub async fn request(&self, email: &str) -> Result<(), ResetError> {
        let user = self
            .store
            .find_by_email(email.trim())
            .await?
            .ok_or(ResetError::EmailNotFound)?;
        if user.is_incomplete() {
            return Err(ResetError::AccountIncomplete);
        }

        let otp = generate_otp();
        self.store
            .update_reset_otp(user.id, &otp, otp_expiry(Utc::now()))
            .await?;

        self.mail.enqueue(OutboundEmail::password_reset(&user.email, &otp));

        tracing::info!(user_id = %user.id, "Password reset code issued");
        Ok(())
    }

    /// Sets a new password if `otp` matches the live code for `email`
    pub async fn confirm(&self, email: &str, otp: &str, new_password: &str) -> Result<(), ResetError> {
        password::validate_new_password(new_password)?;

        let user = self
            .store
            .find_by_email(email.trim())
            .await?
            .ok_or(ResetError::EmailNotFound)?;
        if user.is_incomplete() {
            return Err(ResetError::AccountIncomplete);
        }

        let accepted = otp_accepts(
            user.reset_otp.as_deref(),
            user.reset_otp_expires_at,
            user.reset_attempts,
            otp,
            Utc::now(),
        );

        if !accepted {
            if user.reset_otp.is_some() {
                let attempts = self.store.record_failed_reset_attempt(user.id).await?;
                if attempts >= MAX_RESET_ATTEMPTS {
                    tracing::warn!(user_id = %user.id, attempts, "Reset code locked after failed attempts");
                }
            }
            return Err(ResetError::OtpInvalid);
        }

        let hash = password::hash_password(new_password)?;

        // Another request may have spent or replaced the code since it was read
        if !self.store.consume_reset_otp(user.id, otp, &hash).await? {
            return Err(ResetError::OtpInvalid);
        }

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }
}
