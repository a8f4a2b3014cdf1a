//! Request helpers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Resolve the real client address for rate-limiting purposes.
///
/// Proxy headers win over the socket peer: the first `X-Forwarded-For` hop,
/// then `X-Real-IP`, then the connection's remote address. Requests arriving
/// without any of these (only possible outside a real listener) share one
/// bucket.
pub fn client_ip(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded
            .split(',')
            .map(str::trim)
            .find(|hop| !hop.is_empty())
        {
            return first.to_string();
        }
    }
    if let Some(real_ip) = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
