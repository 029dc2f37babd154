//! Fixed-window request limiter backed by Redis.
//!
//! Each client IP gets one counter per window, `ratelimit:{ip}:{window}`,
//! which expires with the window. If Redis cannot be reached the request is
//! let through.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub fn window_key(ip: &str, now_ms: i64, window_ms: i64) -> String {
    format!("ratelimit:{}:{}", ip, now_ms / window_ms.max(1))
}

/// The socket peer. With `trust_proxy` the first `X-Forwarded-For` hop wins,
/// since the proxy in front is then the only direct client.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .and_then(|v| v.parse::<IpAddr>().ok())
    };
    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|p| p.ip()))
        .map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
}

async fn hit(state: &AppState, key: &str, ttl_secs: i64) -> redis::RedisResult<u64> {
    let mut conn = state.redis.get_multiplexed_async_connection().await?;
    let (count,): (u64,) = redis::pipe()
        .atomic()
        .incr(key, 1u64)
        .expire(key, ttl_secs)
        .ignore()
        .query_async(&mut conn)
        .await?;
    Ok(count)
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let max = state.config.rate_limit_max_requests;
    if max == 0 {
        return next.run(request).await;
    }

    let window_ms = state.config.rate_limit_window.as_millis() as i64;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer, state.config.trust_proxy);
    let key = window_key(&ip, Utc::now().timestamp_millis(), window_ms);
    let ttl_secs = state.config.rate_limit_window.as_secs().max(1) as i64;

    let count = match hit(&state, &key, ttl_secs).await {
        Ok(count) => count,
        Err(e) => {
            warn!("Rate limiter unavailable, allowing request: {e}");
            return next.run(request).await;
        }
    };

    if count > max {
        return AppError::TooManyRequests.into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(max));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(max - count));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_key_buckets() {
        let window = 15 * 60 * 1000;
        let a = window_key("10.0.0.1", 1_000, window);
        let b = window_key("10.0.0.1", window - 1, window);
        let c = window_key("10.0.0.1", window, window);
        assert_eq!(a, "ratelimit:10.0.0.1:0");
        assert_eq!(a, b);
        assert_eq!(c, "ratelimit:10.0.0.1:1");
    }

    #[test]
    fn test_client_ip_ignores_forwarded_for_by_default() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer), false), "192.168.1.5");
        assert_eq!(client_ip(&headers, None, false), "unknown");

        // A client rotating the header still lands in its own bucket.
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(client_ip(&headers, Some(peer), false), "192.168.1.5");
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.7"));
        assert_eq!(client_ip(&headers, Some(peer), false), "192.168.1.5");
    }

    #[test]
    fn test_client_ip_behind_trusted_proxy() {
        let peer: SocketAddr = "10.0.0.2:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer), true), "10.0.0.2");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(client_ip(&headers, Some(peer), true), "10.0.0.2");
    }
}
