//! reCAPTCHA `siteverify` client.
//!
//! Reference: https://developers.google.com/recaptcha/docs/verify

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::{BotVerifier, VerificationResult, VerifyError};

/// Body returned by the `siteverify` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl From<SiteVerifyResponse> for VerificationResult {
    fn from(resp: SiteVerifyResponse) -> Self {
        VerificationResult {
            success: resp.success,
            score: resp.score,
            action: resp.action,
            hostname: resp.hostname,
            error_codes: resp.error_codes,
        }
    }
}

/// Verifies tokens against the reCAPTCHA API with a pre-shared secret.
#[derive(Clone)]
pub struct RecaptchaClient {
    client: Client,
    verify_url: String,
    secret: String,
}

impl RecaptchaClient {
    /// Create a client for `verify_url` using `secret`.
    ///
    /// The `reqwest::Client` is shared, so connections are pooled across requests.
    pub fn new(client: Client, verify_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client,
            verify_url: verify_url.into(),
            secret: secret.into(),
        }
    }

    /// Build the verification URL with `secret` and `response` query parameters.
    fn request_url(&self, token: &str) -> Result<Url, VerifyError> {
        let url = Url::parse_with_params(
            &self.verify_url,
            &[("secret", self.secret.as_str()), ("response", token)],
        )?;
        Ok(url)
    }
}

/// Decode a `siteverify` body.
///
/// Anything that is not a JSON object is an error. An object whose fields have
/// unexpected types decodes as an unsuccessful verification.
pub fn parse_response(body: &[u8]) -> Result<VerificationResult, VerifyError> {
    let value: Value = serde_json::from_slice(body)?;

    if !value.is_object() {
        return Err(VerifyError::InvalidResponse(serde::de::Error::custom(
            "siteverify body is not a JSON object",
        )));
    }

    let parsed = match serde_json::from_value::<SiteVerifyResponse>(value) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "recaptcha_response_unexpected_shape");
            SiteVerifyResponse::default()
        }
    };

    Ok(parsed.into())
}

#[async_trait]
impl BotVerifier for RecaptchaClient {
    async fn verify(&self, token: &str) -> Result<VerificationResult, VerifyError> {
        let url = self.request_url(token)?;

        let resp = self.client.post(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        let result = parse_response(&body)?;

        info!(
            status_code = status,
            success = result.success,
            score = ?result.score,
            action = ?result.action,
            error_codes = ?result.error_codes,
            "recaptcha_verify_complete"
        );

        Ok(result)
    }
}
