//! Outbound email relay.
//!
//! The handler only sees the [`MessageRelay`] trait; [`SmtpRelay`] is the
//! production implementation.

pub mod smtp;

use async_trait::async_trait;
use thiserror::Error;

pub use smtp::{compose_message, SmtpRelay};

/// Failure while composing or handing off a message.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing required config: {0}")]
    NotConfigured(&'static str),

    #[error("invalid email address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Hands one contact message to an email-sending service.
#[async_trait]
pub trait MessageRelay: Send + Sync {
    /// Compose and send a single message. One attempt, no retry.
    ///
    /// `email` becomes the reply-to address; the recipient is fixed by the relay.
    async fn send(&self, name: &str, email: &str, message: &str) -> Result<(), RelayError>;
}
