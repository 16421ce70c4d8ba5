//! API Error Taxonomy
//!
//! Every handler returns `Result<_, ApiError>`. Errors are serialized as
//! `{"error": "<message>"}`; internal failures are logged and replaced by a
//! generic message so store or mail internals never reach the client.

use crate::auth::user_store::StoreError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::time::Duration;

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input (400)
    Validation(String),
    /// Duplicate resource (409)
    Conflict(String),
    /// Bad credentials or missing authorization (401)
    Unauthorized(String),
    /// Unknown resource (404)
    NotFound(String),
    /// Client exceeded its request budget (429)
    RateLimited { retry_after: Duration },
    /// Unexpected store/mail/runtime failure (500)
    Internal {
        source: anyhow::Error,
        message: &'static str,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".to_string())
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("Invalid credentials".to_string())
    }

    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            source: source.into(),
            message: GENERIC_INTERNAL_MESSAGE,
        }
    }

    /// Internal failure with a caller-chosen public message.
    pub fn internal_with(source: impl Into<anyhow::Error>, message: &'static str) -> Self {
        ApiError::Internal {
            source: source.into(),
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &str {
        match self {
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg) => msg,
            ApiError::RateLimited { .. } => "Too many requests",
            ApiError::Internal { message, .. } => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Internal { source, message } => write!(f, "{message}: {source:#}"),
            other => f.write_str(other.public_message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => ApiError::Conflict("Username already exists".to_string()),
            other => ApiError::internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal { source, message } = &self {
            tracing::error!(error = %format!("{source:#}"), "{}", message);
        }

        let body = Json(json!({ "error": self.public_message() }));

        match self {
            ApiError::RateLimited { retry_after } => {
                let secs = retry_after.as_secs().max(1);
                (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
