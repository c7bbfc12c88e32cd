//! Rate limiting middleware.
//!
//! Runs before routing reaches any handler. Limited responses carry the
//! `RateLimit-*` headers; rejections also carry `Retry-After`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use super::client_ip::client_key;
use super::handlers::{AppState, MessageResponse};
use crate::rate_limit::RateLimitResult;

const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");
const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Per-client rate limiting for every route.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req, state.config.trust_proxy);
    let window_secs = state.limiter.config().window.as_secs();

    let result = match state.limiter.check(&key).await {
        Ok(r) => r,
        Err(e) => {
            // Fail open.
            error!(client = %key, error = %e, "rate_limit_check_failed");
            return next.run(req).await;
        }
    };

    if !result.allowed {
        warn!(
            client = %key,
            retry_after_secs = ceil_secs(&result),
            "rate_limit_exceeded"
        );
        let mut response = MessageResponse::with_status(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later.",
        );
        let headers = response.headers_mut();
        insert_headers(headers, &result, window_secs);
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(ceil_secs(&result)),
        );
        return response;
    }

    let mut response = next.run(req).await;
    insert_headers(response.headers_mut(), &result, window_secs);
    response
}

fn ceil_secs(result: &RateLimitResult) -> u64 {
    let reset = result.reset_after;
    reset.as_secs() + u64::from(reset.subsec_nanos() > 0)
}

fn insert_headers(headers: &mut HeaderMap, result: &RateLimitResult, window_secs: u64) {
    if let Ok(policy) = HeaderValue::from_str(&format!("{};w={}", result.limit, window_secs)) {
        headers.insert(RATELIMIT_POLICY, policy);
    }
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(result)));
}
