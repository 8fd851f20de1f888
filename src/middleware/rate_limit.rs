use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::debug;

use crate::handlers::ErrorResponse;

/// Expired windows are swept once every this many requests.
const SWEEP_EVERY: u64 = 1024;

/// Fixed-window request counter per client address.
#[derive(Clone)]
pub struct RateLimit {
    store: Arc<DashMap<String, RateLimitData>>,
    requests: Arc<AtomicU64>,
    max_requests: u32,
    window_seconds: i64,
}

#[derive(Debug, Clone)]
struct RateLimitData {
    count: u32,
    window_start: DateTime<Utc>,
}

impl RateLimit {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            requests: Arc::new(AtomicU64::new(0)),
            max_requests,
            window_seconds,
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    /// Count one request from `client`; `false` once it is over the limit.
    fn admit(&self, client: String, now: DateTime<Utc>) -> bool {
        let window = Duration::seconds(self.window_seconds);
        if self.requests.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep(now, window);
        }

        let mut entry = self.store.entry(client).or_insert_with(|| RateLimitData {
            count: 0,
            window_start: now,
        });
        let data = entry.value_mut();

        if now.signed_duration_since(data.window_start) >= window {
            data.count = 0;
            data.window_start = now;
        }

        data.count += 1;
        data.count <= self.max_requests
    }

    /// Forget clients whose window has run out.
    fn sweep(&self, now: DateTime<Utc>, window: Duration) {
        let before = self.store.len();
        self.store
            .retain(|_, data| now.signed_duration_since(data.window_start) < window);
        debug!(removed = before.saturating_sub(self.store.len()), "rate limit buckets swept");
    }
}

/// IP-based rate limiting middleware.
///
/// Requests served without connection info (in-process tests, some
/// proxies) share one bucket.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimit>,
    req: Request,
    next: Next,
) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !rate_limit.admit(client.clone(), Utc::now()) {
        debug!(%client, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Rate limit exceeded".to_string(),
            }),
        )
            .into_response();
    }

    next.run(req).await
}
