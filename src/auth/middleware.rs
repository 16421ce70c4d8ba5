//! Authentication Middleware
//! Mission: Guard protected routes on the Authorization header
//!
//! Two modes:
//! - `Presence`: any non-empty `Authorization` header passes. Valid bearer
//!   tokens still have their claims attached, invalid ones are not rejected.
//! - `Verify`: the header must carry a `Bearer` JWT with a valid signature
//!   and expiry.

use crate::auth::jwt::TokenIssuer;
use crate::error::ApiError;
use anyhow::bail;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Paths that never require authorization.
pub const PUBLIC_PATHS: &[&str] = &["/auth/register", "/auth/login"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthGuardMode {
    #[default]
    Presence,
    Verify,
}

impl FromStr for AuthGuardMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "presence" | "0" | "false" | "off" => Ok(AuthGuardMode::Presence),
            "verify" | "1" | "true" | "on" => Ok(AuthGuardMode::Verify),
            other => bail!("unknown auth guard mode '{other}' (expected presence|verify)"),
        }
    }
}

#[derive(Clone)]
pub struct AuthGuard {
    issuer: Arc<TokenIssuer>,
    mode: AuthGuardMode,
}

impl AuthGuard {
    pub fn new(issuer: Arc<TokenIssuer>, mode: AuthGuardMode) -> Self {
        Self { issuer, mode }
    }
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Route guard for protected endpoints
pub async fn auth_middleware(
    State(guard): State<AuthGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let has_header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| !value.as_bytes().iter().all(u8::is_ascii_whitespace))
        .unwrap_or(false);
    if !has_header {
        debug!(path = %req.uri().path(), "Missing authorization header");
        return Err(ApiError::unauthorized());
    }

    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string());

    let claims = match guard.mode {
        AuthGuardMode::Presence => bearer.and_then(|token| guard.issuer.verify(&token).ok()),
        AuthGuardMode::Verify => {
            let token = bearer.ok_or_else(|| {
                ApiError::Unauthorized(
                    "Invalid authorization format. Use: Bearer {token}".to_string(),
                )
            })?;
            let claims = guard
                .issuer
                .verify(&token)
                .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
            Some(claims)
        }
    };

    if let Some(claims) = claims {
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}
