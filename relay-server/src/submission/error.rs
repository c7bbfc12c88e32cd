//! Submission failure taxonomy.
//!
//! Every variant is terminal for the request and maps to exactly one HTTP
//! status and one caller-facing message. Provider details stay in the
//! `#[source]` chain and are only ever logged.

use axum::http::StatusCode;
use thiserror::Error;

use crate::relay::RelayError;
use crate::verify::VerifyError;

/// The form field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidField {
    Name,
    Email,
    Message,
}

impl InvalidField {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidField::Name => "name",
            InvalidField::Email => "email",
            InvalidField::Message => "message",
        }
    }
}

/// Why a submission was not relayed.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("invalid {}", .0.as_str())]
    InvalidInput(InvalidField),

    #[error("missing bot-check token")]
    MissingToken,

    #[error("bot check failed")]
    BotCheckFailed,

    #[error("bot verification unavailable")]
    VerificationUnavailable(#[source] VerifyError),

    #[error("message relay failed")]
    RelayFailed(#[source] RelayError),
}

impl SubmissionError {
    /// HTTP status returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubmissionError::InvalidInput(_) | SubmissionError::MissingToken => {
                StatusCode::BAD_REQUEST
            }
            SubmissionError::BotCheckFailed => StatusCode::FORBIDDEN,
            SubmissionError::VerificationUnavailable(_) | SubmissionError::RelayFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            SubmissionError::InvalidInput(InvalidField::Name) => {
                "Invalid name. It must be at least 2 characters."
            }
            SubmissionError::InvalidInput(InvalidField::Email) => "Invalid email address.",
            SubmissionError::InvalidInput(InvalidField::Message) => {
                "Invalid message. It must be at least 5 characters."
            }
            SubmissionError::MissingToken => "Missing reCAPTCHA token.",
            SubmissionError::BotCheckFailed => "Failed reCAPTCHA verification.",
            SubmissionError::VerificationUnavailable(_) => "reCAPTCHA verification failed.",
            SubmissionError::RelayFailed(_) => "Error sending email.",
        }
    }
}
