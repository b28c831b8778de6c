//! Rate limiting middleware for the REST API
//!
//! Token bucket per client address. The bucket holds a minute's worth of
//! requests and refills continuously, so a client may burst up to the limit
//! and then proceeds at the configured rate.

use super::types::ErrorBody;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Buckets untouched for this long are dropped during pruning
const IDLE_EXPIRY: Duration = Duration::from_secs(600);

/// Prune once the map holds this many clients
const PRUNE_THRESHOLD: usize = 10_000;

/// Token bucket rate limiter
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn per_minute(limit: u32) -> Self {
        let capacity = f64::from(limit.max(1));
        Self {
            capacity,
            tokens: capacity,
            refill_rate: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume a token, returns true if allowed
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get time until a token will be available
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Per-client limiter, owned by the server and injected into the middleware
#[derive(Debug)]
pub struct RateLimiterState {
    per_minute: u32,
    buckets: DashMap<String, TokenBucket>,
}

impl RateLimiterState {
    pub fn new(per_minute: u32) -> Self {
        Self {
            per_minute,
            buckets: DashMap::new(),
        }
    }

    /// Take a token for `client`, or report how long until one is available
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        if self.buckets.len() >= PRUNE_THRESHOLD {
            self.prune_idle();
        }

        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::per_minute(self.per_minute));

        if bucket.try_acquire() {
            Ok(())
        } else {
            Err(bucket.time_until_available())
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn prune_idle(&self) {
        self.buckets
            .retain(|_, bucket| bucket.last_refill.elapsed() < IDLE_EXPIRY);
    }
}

/// Client key: peer address when known, else the first forwarded hop
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);

    if let Err(wait_time) = state.check(&client) {
        tracing::warn!(
            client = %client,
            path = %request.uri().path(),
            "Rate limit exceeded, retry after {}ms",
            wait_time.as_millis()
        );
        return rate_limit_response(wait_time);
    }

    next.run(request).await
}

fn rate_limit_response(retry_after: Duration) -> Response {
    let retry_seconds = (retry_after.as_secs_f64().ceil() as u64).max(1);

    let body = Json(ErrorBody {
        error: "rate limit exceeded".to_string(),
        code: "RATE_LIMITED".to_string(),
        details: Some(format!("retry after {} seconds", retry_seconds)),
        timestamp: chrono::Utc::now().to_rfc3339(),
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_seconds));
    response
}
