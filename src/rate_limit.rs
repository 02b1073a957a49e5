// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window request limiting per client IP.
//!
//! Counters live in a bounded LRU so a flood of distinct addresses cannot grow
//! memory without limit; evicted clients simply start a fresh window.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lru::LruCache;

use crate::error::ApiError;

/// Number of client windows tracked at once.
const TRACKED_CLIENTS: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<LruCache<IpAddr, Window>>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        let capacity = NonZeroUsize::new(TRACKED_CLIENTS).unwrap_or(NonZeroUsize::MIN);
        Self {
            windows: Arc::new(Mutex::new(LruCache::new(capacity))),
            window,
            max_requests: max_requests.max(1),
        }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        // A poisoned lock fails open: limiting is best-effort.
        let Ok(mut windows) = self.windows.lock() else {
            return true;
        };
        match windows.get_mut(&ip) {
            Some(w) if now.duration_since(w.started) < self.window => {
                if w.count >= self.max_requests {
                    return false;
                }
                w.count += 1;
                true
            }
            _ => {
                windows.put(ip, Window { started: now, count: 1 });
                true
            }
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(ip) = client_ip(&req) {
        if !limiter.check(ip) {
            tracing::warn!(ip = %ip, "Rate limit exceeded");
            return ApiError::too_many_requests("Too many requests, please try again later")
                .into_response();
        }
    }
    next.run(req).await
}

/// ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn client_ip(req: &Request) -> Option<IpAddr> {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip());
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .or_else(|| header("x-real-ip").and_then(|v| v.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn blocks_after_max_requests_in_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(ip, now));
        }
        assert!(!limiter.check_at(ip, now));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let now = Instant::now();

        assert!(limiter.check_at(ip, now));
        assert!(!limiter.check_at(ip, now + Duration::from_secs(30)));
        assert!(limiter.check_at(ip, now + Duration::from_secs(61)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1".parse().unwrap(), now));
        assert!(limiter.check_at("10.0.0.2".parse().unwrap(), now));
    }

    #[test]
    fn forwarded_header_is_used_without_connect_info() {
        let req = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), Some("203.0.113.7".parse().unwrap()));
    }
}
