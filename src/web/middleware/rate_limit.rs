//! Rate limiting middleware.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

/// Rate limiter keyed by client IP.
pub type IpRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// State for rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-IP limiter for the drive API.
    limiter: Arc<IpRateLimiter>,
    /// API rate limit (requests per minute).
    api_rate_limit: u32,
    /// Whether forwarding headers identify the client.
    trust_proxy_headers: bool,
}

impl RateLimitState {
    /// Create a new rate limit state allowing `api_rate_limit` requests per minute per IP.
    pub fn new(api_rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(api_rate_limit).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            api_rate_limit,
            trust_proxy_headers: false,
        }
    }

    /// Key clients on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Configured requests per minute.
    pub fn api_rate_limit(&self) -> u32 {
        self.api_rate_limit
    }

    /// Check if a request is allowed for the given IP.
    pub fn check_api(&self, ip: &str) -> bool {
        self.limiter.check_key(&ip.to_string()).is_ok()
    }

    /// Drop limiter state for clients that are back at full quota.
    pub fn cleanup(&self) {
        self.limiter.retain_recent();
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await; // Every 5 minutes
                self.cleanup();
            }
        });
    }
}

/// Extract client IP from request.
///
/// Forwarding headers are client-controlled, so they are only read when
/// `trust_proxy_headers` is set; otherwise the peer address is used.
fn get_client_ip(req: &Request<Body>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(req) {
            return ip;
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Client IP reported by a reverse proxy.
fn forwarded_ip(req: &Request<Body>) -> Option<String> {
    // Take the first IP in the chain
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        // Take the first IP in the chain
        if let Some(ip) = forwarded.split(',').next() {
            return Some(ip.trim().to_string());
        }
    }

    req.headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
}

/// Rate limiting middleware for the drive API.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req, state.trust_proxy_headers);

    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
