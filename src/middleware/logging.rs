//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency,
//! tags it with a request id and feeds the request counters.

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use metrics::{histogram, increment_counter};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that logs HTTP requests with timing information.
///
/// INFO for completed requests, WARN for 5xx. Health probes skip the log
/// line but still get a request id.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let request_id = Uuid::new_v4().to_string();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let latency = start.elapsed();
    let status = response.status().as_u16();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    increment_counter!("http_requests_total", &labels);
    histogram!("http_request_duration_seconds", latency.as_secs_f64(), &labels);

    // Skip logging for health checks to reduce noise
    if path == "/health" {
        return response;
    }

    let _entered = span.enter();
    if status >= 500 {
        warn!(
            status = status,
            latency_ms = latency.as_millis() as u64,
            client_ip = %client_ip,
            "Request failed (5xx)"
        );
    } else {
        info!(
            status = status,
            latency_ms = latency.as_millis() as u64,
            client_ip = %client_ip,
            "Request completed"
        );
    }

    response
}
