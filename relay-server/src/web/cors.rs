//! CORS policy.

use axum::http::{header::InvalidHeaderValue, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};

/// Allow exactly one browser origin, with credentials.
///
/// Requested headers are mirrored back so the form may send any headers it
/// needs. Preflight requests are answered here and never reach the routes.
pub fn create_cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin: HeaderValue = origin.trim().parse()?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ]))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
