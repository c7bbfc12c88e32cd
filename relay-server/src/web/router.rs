//! Router assembly.

use axum::{
    http::header::InvalidHeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::cors::create_cors_layer;
use super::handlers::{health, send_message, AppState};
use super::rate_limit::rate_limit;

/// Build the application router.
///
/// Fails only if the configured CORS origin is not a valid header value.
pub fn build_router(state: AppState) -> Result<Router, InvalidHeaderValue> {
    let cors = create_cors_layer(&state.config.cors_origin)?;

    Ok(Router::new()
        .route("/health", get(health))
        .route("/send", post(send_message))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::rate_limit::{RateLimitConfig, RateLimiter};
    use crate::submission::testing::{FakeRelay, FakeVerifier, Verdict};
    use crate::Config;

    const ORIGIN: &str = "https://theitalianuncut.ch";

    struct Harness {
        router: Router,
        verifier: Arc<FakeVerifier>,
        relay: Arc<FakeRelay>,
    }

    fn harness(verifier: FakeVerifier, relay: FakeRelay) -> Harness {
        let config = Config::default();
        let limiter = Arc::new(RateLimiter::in_memory(RateLimitConfig::new(
            config.rate_limit_max,
            config.rate_limit_window,
        )));
        let verifier = Arc::new(verifier);
        let relay = Arc::new(relay);
        let state = AppState::new(config, verifier.clone(), relay.clone(), limiter);

        Harness {
            router: build_router(state).unwrap(),
            verifier,
            relay,
        }
    }

    fn post_send(body: Value, peer: &str) -> Request<Body> {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    fn valid_body() -> Value {
        json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "message": "I would like to book a table.",
            "token": "recaptcha-token"
        })
    }

    async fn read_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(h: &Harness, body: Value) -> (StatusCode, Value) {
        let response = h
            .router
            .clone()
            .oneshot(post_send(body, "203.0.113.10:40000"))
            .await
            .unwrap();
        let status = response.status();
        (status, read_json(response).await)
    }

    #[tokio::test]
    async fn test_send_success() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());

        let (status, body) = send(&h, valid_body()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Email sent successfully!"}));
        assert_eq!(h.verifier.calls(), 1);
        assert_eq!(h.relay.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_short_name() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body["name"] = json!("  A  ");

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid name. It must be at least 2 characters."})
        );
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_non_string_name() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body["name"] = json!(12345);

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid name. It must be at least 2 characters."})
        );
    }

    #[tokio::test]
    async fn test_send_invalid_email() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body["email"] = json!("ada@localhost");

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Invalid email address."}));
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_short_message() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body["message"] = json!(" hey ");

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid message. It must be at least 5 characters."})
        );
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_missing_token() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("token");

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Missing reCAPTCHA token."}));
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_numeric_token_is_missing() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut body = valid_body();
        body["token"] = json!(123);

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Missing reCAPTCHA token."}));
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_verification_unsuccessful() {
        let h = harness(
            FakeVerifier::new(Verdict::Score(false, None)),
            FakeRelay::ok(),
        );

        let (status, body) = send(&h, valid_body()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({"message": "Failed reCAPTCHA verification."}));
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_low_score() {
        let h = harness(
            FakeVerifier::new(Verdict::Score(true, Some(0.4))),
            FakeRelay::ok(),
        );

        let (status, body) = send(&h, valid_body()).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({"message": "Failed reCAPTCHA verification."}));
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_verification_error() {
        let h = harness(FakeVerifier::new(Verdict::Unavailable), FakeRelay::ok());

        let (status, body) = send(&h, valid_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "reCAPTCHA verification failed."}));
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_relay_error() {
        let h = harness(FakeVerifier::human(), FakeRelay::failing());

        let (status, body) = send(&h, valid_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "Error sending email."}));
        assert_eq!(h.verifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_send_malformed_json() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("203.0.113.10:1".parse::<SocketAddr>().unwrap()));

        let response = h.router.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({"message": "Invalid request body."})
        );
        assert_eq!(h.verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_array_body() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let body = json!(["Ada Lovelace", "ada@example.com", "Hello there", "tok"]);

        let (status, body) = send(&h, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"message": "Invalid name. It must be at least 2 characters."})
        );
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_send_scalar_body() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());

        let (status, body) = send(&h, json!("Ada Lovelace")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "Invalid request body."}));
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_thirty_first_request() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut invalid = valid_body();
        invalid["email"] = json!("nope");

        for i in 0..30 {
            // Mix valid and invalid payloads; both count.
            let body = if i % 2 == 0 { valid_body() } else { invalid.clone() };
            let response = h
                .router
                .clone()
                .oneshot(post_send(body, "198.51.100.4:5000"))
                .await
                .unwrap();
            assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(
                response.headers()["ratelimit-remaining"],
                (29 - i).to_string().as_str()
            );
        }

        let response = h
            .router
            .clone()
            .oneshot(post_send(valid_body(), "198.51.100.4:5001"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(response.headers()["ratelimit-policy"], "30;w=900");
        assert_eq!(
            read_json(response).await,
            json!({"message": "Too many requests, please try again later."})
        );
        assert_eq!(h.verifier.calls(), 15);

        // A different client is still served.
        let response = h
            .router
            .clone()
            .oneshot(post_send(valid_body(), "198.51.100.5:5000"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("127.0.0.1:9".parse::<SocketAddr>().unwrap()));

        let response = h.router.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut req = post_send(valid_body(), "203.0.113.10:1");
        req.headers_mut()
            .insert(header::ORIGIN, ORIGIN.parse().unwrap());

        let response = h.router.clone().oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            ORIGIN
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_never_echoes_other_origins() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());
        let mut req = post_send(valid_body(), "203.0.113.10:1");
        req.headers_mut()
            .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

        let response = h.router.clone().oneshot(req).await.unwrap();

        // The allowed origin is a constant; browsers on other origins block the read.
        let allowed = &response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN];
        assert_eq!(allowed, ORIGIN);
        assert_ne!(allowed, "https://evil.example");
    }

    #[tokio::test]
    async fn test_preflight_is_not_rate_limited() {
        let h = harness(FakeVerifier::human(), FakeRelay::ok());

        for _ in 0..40 {
            let mut req = Request::builder()
                .method(Method::OPTIONS)
                .uri("/send")
                .header(header::ORIGIN, ORIGIN)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap();
            req.extensions_mut()
                .insert(ConnectInfo("192.0.2.1:1".parse::<SocketAddr>().unwrap()));

            let response = h.router.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
                "content-type"
            );
        }

        let response = h
            .router
            .clone()
            .oneshot(post_send(valid_body(), "192.0.2.1:1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-remaining"], "29");
    }
}
