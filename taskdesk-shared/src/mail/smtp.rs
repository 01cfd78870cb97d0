/// SMTP delivery via lettre
///
/// Connects with STARTTLS on the submission port and authenticates with the
/// configured account, which is also used as the sender address.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{MailError, Mailer, OutboundEmail};

/// Sends mail through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds a pooled transport for `host`
    ///
    /// No connection is made until the first message is sent.
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self, MailError> {
        let from: Mailbox = username
            .parse()
            .map_err(|e| MailError::Build(format!("Invalid sender address '{}': {}", username, e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(format!("Invalid SMTP relay '{}': {}", host, e)))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from })
    }

    fn build_message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::Build(format!("Invalid recipient '{}': {}", email.to, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(to = %email.to, subject = %email.subject, "Mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_sender() {
        assert!(matches!(
            SmtpMailer::new("smtp.example.com", "not an address", "pw"),
            Err(MailError::Build(_))
        ));
    }

    #[tokio::test]
    async fn test_builds_plain_text_message() {
        let mailer = SmtpMailer::new("smtp.example.com", "desk@example.com", "pw").unwrap();
        let message = mailer
            .build_message(&OutboundEmail::password_reset("ada@example.com", "123456"))
            .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: ada@example.com"));
        assert!(raw.contains("Subject: Password Reset OTP"));
        assert!(raw.contains("123456"));
    }

    #[tokio::test]
    async fn test_rejects_bad_recipient() {
        let mailer = SmtpMailer::new("smtp.example.com", "desk@example.com", "pw").unwrap();
        let result = mailer.build_message(&OutboundEmail::new("nope", "s", "b"));
        assert!(matches!(result, Err(MailError::Build(_))));
    }
}
