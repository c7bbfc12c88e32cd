//! HTTP endpoint handlers.
//!
//! `POST /send` is a thin adapter: it decodes the JSON body, runs
//! [`process_submission`] and turns the outcome into a `{message}` response.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::rate_limit::RateLimiter;
use crate::relay::MessageRelay;
use crate::submission::{process_submission, SubmissionError, SubmissionRequest};
use crate::verify::BotVerifier;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<dyn BotVerifier>,
    pub relay: Arc<dyn MessageRelay>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: Config,
        verifier: Arc<dyn BotVerifier>,
        relay: Arc<dyn MessageRelay>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
            relay,
            limiter,
        }
    }
}

/// `{message}` body used by every `/send` outcome.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn with_status(status: StatusCode, message: &'static str) -> Response {
        (status, Json(MessageResponse { message })).into_response()
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        MessageResponse::with_status(self.status_code(), self.public_message())
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Contact Form
// =============================================================================

/// Contact-form endpoint.
///
/// This endpoint:
/// 1. Validates name, email, message and token
/// 2. Verifies the token with the bot-check provider
/// 3. Relays the message by email
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            warn!(error = %rejection, "send_body_rejected");
            return MessageResponse::with_status(
                StatusCode::BAD_REQUEST,
                "Invalid request body.",
            );
        }
    };

    match process_submission(
        state.verifier.as_ref(),
        state.relay.as_ref(),
        state.config.recaptcha_min_score,
        request,
    )
    .await
    {
        Ok(()) => MessageResponse::with_status(StatusCode::OK, "Email sent successfully!"),
        Err(e) => e.into_response(),
    }
}
