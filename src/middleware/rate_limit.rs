//! Rate limiting middleware.
//!
//! In-memory fixed-window limiter keyed by client address. Each client may
//! make `max_requests` requests per `window`; the window restarts on the first
//! request after it elapses. Rejected requests do not count against the budget.

use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::increment_counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Key used when the connection address is not available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Rate limiter state tracking requests per client.
#[derive(Clone)]
pub struct RateLimitLayer {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Exceeded { retry_after: Duration },
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if request should be allowed.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        let mut state = self.state.lock();

        let entry = state
            .entry(client.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // Reset window if expired
        if now.saturating_duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_requests {
            let reset_at = entry.window_start + self.config.window;
            return RateLimitDecision::Exceeded {
                retry_after: reset_at.saturating_duration_since(now),
            };
        }

        entry.count += 1;
        RateLimitDecision::Allowed {
            remaining: self.config.max_requests - entry.count,
        }
    }

    /// Requests counted for `client` in its current window.
    pub fn count_at(&self, client: &str, now: Instant) -> u32 {
        let state = self.state.lock();
        match state.get(client) {
            Some(entry)
                if now.saturating_duration_since(entry.window_start) < self.config.window =>
            {
                entry.count
            }
            _ => 0,
        }
    }

    /// Periodic cleanup of old entries (call from a background task).
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let before = state.len();
        let window = self.config.window;

        state.retain(|_, entry| now.saturating_duration_since(entry.window_start) < window * 2);
        before - state.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.state.lock().len()
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Rate limiting middleware function.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimitLayer>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match limiter.check(&client) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Exceeded { retry_after } => {
            warn!(
                client = %client,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            increment_counter!("rate_limit_rejections_total");
            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}
