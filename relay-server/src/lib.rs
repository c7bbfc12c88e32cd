//! Contact Relay - contact-form backend.
//!
//! Accepts a contact-form submission, validates it, verifies its reCAPTCHA
//! token and forwards it to the operator by email.
//!
//! ## Architecture
//!
//! ```text
//! POST /send → rate limit → validate → reCAPTCHA siteverify → SMTP relay
//! ```

pub mod config;
pub mod rate_limit;
pub mod relay;
pub mod submission;
pub mod verify;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use rate_limit::{InMemoryRateLimitStore, RateLimitConfig, RateLimitStore, RateLimiter};
pub use relay::{MessageRelay, RelayError, SmtpRelay};
pub use submission::{process_submission, SubmissionError, SubmissionRequest};
pub use verify::{BotVerifier, RecaptchaClient, VerificationResult, VerifyError};
pub use web::{build_router, AppState};
