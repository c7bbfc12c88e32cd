//! SMTP relay built on lettre.
//!
//! Messages go out through an authenticated relay (Gmail by default) with the
//! operator account as sender and recipient, and the submitter as reply-to.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{MessageRelay, RelayError};

/// Compose the operator notification for one submission.
///
/// `from` and `to` are operator addresses; `email` is set as reply-to so the
/// operator can answer the submitter directly.
pub fn compose_message(
    from: &str,
    to: &str,
    name: &str,
    email: &str,
    message: &str,
) -> Result<Message, RelayError> {
    let from: Mailbox = from.parse()?;
    let to: Mailbox = to.parse()?;
    let reply_to: Mailbox = email.parse()?;

    let msg = Message::builder()
        .from(from)
        .reply_to(reply_to)
        .to(to)
        .subject(format!("New message from {}", name))
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Messaggio inviato da: {} <{}>\n\n{}",
            name, email, message
        ))?;

    Ok(msg)
}

/// Authenticated SMTP relay.
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl SmtpRelay {
    /// Build a relay for `host` (implicit TLS) logging in as `user`.
    ///
    /// No connection is opened here; the first send connects.
    pub fn new(host: &str, user: &str, pass: &str, to: &str) -> Result<Self, RelayError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        Ok(Self {
            transport,
            from: user.to_string(),
            to: to.to_string(),
        })
    }
}

#[async_trait]
impl MessageRelay for SmtpRelay {
    async fn send(&self, name: &str, email: &str, message: &str) -> Result<(), RelayError> {
        if self.from.trim().is_empty() {
            return Err(RelayError::NotConfigured("EMAIL_USER"));
        }
        if self.to.trim().is_empty() {
            return Err(RelayError::NotConfigured("EMAIL_TO"));
        }

        let msg = compose_message(&self.from, &self.to, name, email, message)?;
        let response = self.transport.send(msg).await?;

        info!(
            smtp_code = %response.code(),
            "smtp_message_accepted"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatted(msg: &Message) -> String {
        String::from_utf8(msg.formatted()).unwrap()
    }

    #[test]
    fn test_compose_message_headers() {
        let msg = compose_message(
            "ops@example.com",
            "inbox@example.com",
            "Ada",
            "ada@example.com",
            "Hello there",
        )
        .unwrap();

        let raw = formatted(&msg);
        assert!(raw.contains("From: ops@example.com"));
        assert!(raw.contains("To: inbox@example.com"));
        assert!(raw.contains("Reply-To: ada@example.com"));
        assert!(raw.contains("Subject: New message from Ada"));
        assert!(raw.contains("Messaggio inviato da: Ada <ada@example.com>"));
        assert!(raw.contains("Hello there"));
    }

    #[test]
    fn test_compose_message_invalid_reply_to() {
        let err = compose_message(
            "ops@example.com",
            "ops@example.com",
            "Ada",
            "not an address",
            "Hello there",
        )
        .unwrap_err();

        assert!(matches!(err, RelayError::InvalidAddress(_)));
    }

    #[test]
    fn test_compose_message_missing_operator() {
        let err = compose_message("", "ops@example.com", "Ada", "ada@example.com", "Hello")
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_send_without_account_fails_before_connecting() {
        let relay = SmtpRelay::new("smtp.example.com", "", "", "").unwrap();

        let err = relay
            .send("Ada", "ada@example.com", "Hello there")
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::NotConfigured("EMAIL_USER")));
    }
}
