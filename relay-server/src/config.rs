//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables. A `.env` file in the
//! working directory is loaded first by the binary, so local development can
//! keep secrets out of the shell.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Default reCAPTCHA verification endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Default origin allowed to call the relay from a browser.
pub const DEFAULT_CORS_ORIGIN: &str = "https://theitalianuncut.ch";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    // =========================================================================
    // Bot verification
    // =========================================================================
    /// Pre-shared reCAPTCHA secret key
    pub recaptcha_secret: String,

    /// Verification endpoint (overridable for staging or tests)
    pub recaptcha_verify_url: String,

    /// Minimum score a token must reach to be accepted (0.0 - 1.0)
    pub recaptcha_min_score: f64,

    // =========================================================================
    // Outbound email
    // =========================================================================
    /// SMTP account used to send, also the sender address
    pub email_user: String,

    /// SMTP account password
    pub email_pass: String,

    /// Operator mailbox receiving the submissions
    pub email_to: String,

    /// SMTP relay host
    pub smtp_host: String,

    // =========================================================================
    // HTTP policy
    // =========================================================================
    /// The single origin allowed by the CORS policy
    pub cors_origin: String,

    /// Maximum requests per client within the rate-limit window
    pub rate_limit_max: u32,

    /// Length of the sliding rate-limit window
    pub rate_limit_window: Duration,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer address
    pub trust_proxy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            recaptcha_secret: String::new(),
            recaptcha_verify_url: DEFAULT_VERIFY_URL.to_string(),
            recaptcha_min_score: 0.5,
            email_user: String::new(),
            email_pass: String::new(),
            email_to: String::new(),
            smtp_host: "smtp.gmail.com".to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(15 * 60),
            trust_proxy: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let email_user = env::var("EMAIL_USER").unwrap_or_default();
        let email_to = env::var("EMAIL_TO")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| email_user.clone());

        Config {
            port: parse_var("PORT", defaults.port),

            recaptcha_secret: env::var("RECAPTCHA_SECRET_KEY").unwrap_or_default(),

            recaptcha_verify_url: env::var("RECAPTCHA_VERIFY_URL")
                .unwrap_or(defaults.recaptcha_verify_url),

            recaptcha_min_score: parse_var("RECAPTCHA_MIN_SCORE", defaults.recaptcha_min_score),

            email_user,

            email_pass: env::var("EMAIL_PASS").unwrap_or_default(),

            email_to,

            smtp_host: env::var("SMTP_HOST").unwrap_or(defaults.smtp_host),

            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),

            rate_limit_max: parse_var("RATE_LIMIT_MAX", defaults.rate_limit_max),

            rate_limit_window: Duration::from_secs(parse_var(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window.as_secs(),
            )),

            trust_proxy: parse_bool("TRUST_PROXY", defaults.trust_proxy),
        }
    }

    /// Names of required variables that are missing or empty.
    ///
    /// The server still starts without them; verification and relay will fail
    /// at request time instead.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recaptcha_secret.trim().is_empty() {
            missing.push("RECAPTCHA_SECRET_KEY");
        }
        if self.email_user.trim().is_empty() {
            missing.push("EMAIL_USER");
        }
        if self.email_pass.is_empty() {
            missing.push("EMAIL_PASS");
        }
        missing
    }
}

/// Parse a variable with `FromStr`, falling back to `default` when unset or invalid.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(env_var = name, value = %raw, "Invalid value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a boolean flag such as "true", "1", "yes".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}
