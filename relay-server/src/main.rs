//! Contact Relay server.
//!
//! Serves `POST /send` for the website contact form:
//! - Rate limits each client address
//! - Validates the submission and verifies its reCAPTCHA token
//! - Relays the message to the operator mailbox over SMTP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::{
    build_router, AppState, Config, RateLimitConfig, RateLimiter, RecaptchaClient, SmtpRelay,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        cors_origin = %config.cors_origin,
        smtp_host = %config.smtp_host,
        recaptcha_min_score = config.recaptcha_min_score,
        rate_limit_max = config.rate_limit_max,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        trust_proxy = config.trust_proxy,
        "config_loaded"
    );

    let missing = config.missing_secrets();
    if !missing.is_empty() {
        warn!(missing = ?missing, "config_secrets_missing");
    }

    // Outbound collaborators
    let http = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;
    let verifier = RecaptchaClient::new(
        http,
        config.recaptcha_verify_url.clone(),
        config.recaptcha_secret.clone(),
    );

    let relay = SmtpRelay::new(
        &config.smtp_host,
        &config.email_user,
        &config.email_pass,
        &config.email_to,
    )
    .context("Failed to configure SMTP relay")?;

    // Rate limiter with periodic pruning of idle clients
    let limiter = Arc::new(RateLimiter::in_memory(RateLimitConfig::new(
        config.rate_limit_max,
        config.rate_limit_window,
    )));
    limiter.clone().start_cleanup_task(Duration::from_secs(60));

    let port = config.port;
    let state = AppState::new(config, Arc::new(verifier), Arc::new(relay), limiter);

    let app = build_router(state).context("Invalid CORS_ORIGIN")?;

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_server_listening");

    // Peer addresses feed the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("relay_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_server_shutting_down");
}
