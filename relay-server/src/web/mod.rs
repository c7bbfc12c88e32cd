//! HTTP surface.
//!
//! This module provides:
//! - `POST /send` for contact-form submissions
//! - `GET /health` for liveness checks
//! - Per-client rate limiting and a single-origin CORS policy
//!
//! ## Layering
//!
//! ```text
//! CORS → TraceLayer → rate limit → routes
//! ```

pub mod client_ip;
pub mod cors;
pub mod handlers;
pub mod rate_limit;
pub mod router;

pub use cors::create_cors_layer;
pub use handlers::{health, send_message, AppState, HealthResponse, MessageResponse};
pub use router::build_router;
