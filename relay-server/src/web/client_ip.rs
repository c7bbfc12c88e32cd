//! Client identification for rate limiting.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
};

/// Extract the client address used as the rate-limit key.
///
/// Uses the TCP peer address. With `trust_proxy`, the first
/// `X-Forwarded-For` hop wins when it parses as an IP.
pub fn client_key(req: &Request, trust_proxy: bool) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let ip = if trust_proxy {
        forwarded_ip(req.headers()).or(peer)
    } else {
        peer
    };

    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// First address in `X-Forwarded-For`, if it is a valid IP.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}
