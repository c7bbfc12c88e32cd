//! Bot verification.
//!
//! The handler only sees the [`BotVerifier`] trait; [`RecaptchaClient`] is the
//! production implementation talking to Google's `siteverify` endpoint.

pub mod recaptcha;

use async_trait::async_trait;
use thiserror::Error;

pub use recaptcha::{RecaptchaClient, SiteVerifyResponse};

/// Outcome of verifying one token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationResult {
    /// Whether the provider accepted the token
    pub success: bool,
    /// Confidence that the submitter is human (0.0 - 1.0), absent for v2 tokens
    pub score: Option<f64>,
    /// Action name the token was issued for
    pub action: Option<String>,
    /// Hostname of the site where the challenge was solved
    pub hostname: Option<String>,
    /// Provider error codes, if any
    pub error_codes: Vec<String>,
}

impl VerificationResult {
    /// A token passes when the provider accepted it and the score reaches `min_score`.
    ///
    /// A result without a score never passes.
    pub fn is_human(&self, min_score: f64) -> bool {
        self.success && self.score.is_some_and(|score| score >= min_score)
    }
}

/// Transport or decoding failure while verifying a token.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid verification url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verification response is not JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Verifies client-supplied bot-check tokens.
#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// Verify `token` with a single outbound call. Never retried.
    async fn verify(&self, token: &str) -> Result<VerificationResult, VerifyError>;
}
