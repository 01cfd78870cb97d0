/// Outbound email
///
/// Mail is best effort. Services hand messages to the [`MailDispatcher`],
/// which queues them for a background worker; a send failure is logged and
/// never reaches the request that caused it.
///
/// # Mailers
///
/// - [`SmtpMailer`]: SMTP with STARTTLS via lettre
/// - [`LogMailer`]: writes the message to the log, used when no SMTP
///   credentials are configured
/// - [`RecordingMailer`]: keeps messages in memory for tests

pub mod dispatcher;
pub mod smtp;

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::auth::otp::OTP_TTL_MINUTES;

pub use dispatcher::MailDispatcher;
pub use smtp::SmtpMailer;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Bad address or message that could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail queue is closed")]
    QueueClosed,
}

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn password_reset(to: &str, otp: &str) -> Self {
        Self::new(
            to,
            "Password Reset OTP",
            format!(
                "Your password reset OTP is: {}. Valid for {} minutes.",
                otp, OTP_TTL_MINUTES
            ),
        )
    }

    pub fn login_notification(to: &str, name: &str) -> Self {
        Self::new(
            to,
            "Login Notification",
            format!("Hello {}, you just logged into your account.", name),
        )
    }
}

/// Something that can deliver a message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// Logs messages instead of sending them
///
/// Bodies can carry reset codes, so they only appear at TRACE.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail delivery disabled, logging message"
        );
        tracing::trace!(to = %email.to, body = %email.body, "Undelivered mail body");
        Ok(())
    }
}

/// Keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    notify: Notify,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, oldest first
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Waits until at least `count` messages arrived or `timeout` elapsed,
    /// then returns what was delivered
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<OutboundEmail> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.sent();
            }
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        self.notify.notify_waiters();
        Ok(())
    }
}
