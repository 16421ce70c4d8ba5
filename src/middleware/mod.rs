//! Middleware for observability and rate limiting.
//!
//! This module provides:
//! - Request logging with latency tracking and request ids
//! - Fixed-window rate limiting per client address

pub mod logging;
pub mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{rate_limit_middleware, RateLimitConfig, RateLimitDecision, RateLimitLayer};
