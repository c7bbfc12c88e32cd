//! Contact-form submission workflow.
//!
//! ## Processing Flow
//!
//! ```text
//! SubmissionRequest → validate() → BotVerifier::verify() → MessageRelay::send()
//! ```
//!
//! Each stage short-circuits. Nothing leaves the process before the token has
//! been verified, and the relay is only called after verification returns.

pub mod error;
pub mod types;
pub mod validation;

use tracing::{error, info, warn};

use crate::relay::MessageRelay;
use crate::verify::BotVerifier;

pub use error::{InvalidField, SubmissionError};
pub use types::{SubmissionRequest, ValidSubmission};
pub use validation::{is_valid_email, validate};

/// Run one submission through validation, bot verification and relay.
///
/// `min_score` is the lowest verification score accepted as human.
pub async fn process_submission(
    verifier: &dyn BotVerifier,
    relay: &dyn MessageRelay,
    min_score: f64,
    request: SubmissionRequest,
) -> Result<(), SubmissionError> {
    let submission = match validate(request) {
        Ok(s) => s,
        Err(e) => {
            warn!(reason = %e, "submission_invalid");
            return Err(e);
        }
    };

    info!(
        name_length = submission.name.chars().count(),
        message_length = submission.message.chars().count(),
        token_length = submission.token.len(),
        "submission_validated"
    );

    let verdict = verifier.verify(&submission.token).await.map_err(|e| {
        error!(error = %e, "recaptcha_verification_error");
        SubmissionError::VerificationUnavailable(e)
    })?;

    if !verdict.is_human(min_score) {
        warn!(
            success = verdict.success,
            score = ?verdict.score,
            min_score = min_score,
            action = ?verdict.action,
            hostname = ?verdict.hostname,
            error_codes = ?verdict.error_codes,
            "recaptcha_rejected"
        );
        return Err(SubmissionError::BotCheckFailed);
    }

    info!(score = ?verdict.score, "recaptcha_passed");

    relay
        .send(&submission.name, &submission.email, &submission.message)
        .await
        .map_err(|e| {
            error!(error = %e, "email_send_error");
            SubmissionError::RelayFailed(e)
        })?;

    info!("email_relayed");

    Ok(())
}
