//! Authentication API Endpoints
//! Mission: Provide register and login endpoints

use crate::api::extract::ApiJson;
use crate::auth::{
    models::{AuthResponse, Credentials},
    service::AuthService,
};
use crate::error::ApiError;
use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

/// Register endpoint - POST /auth/register
pub async fn register(
    State(auth): State<AuthService>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    info!("🔐 Registration attempt: {}", payload.username);
    let response = auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(auth): State<AuthService>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("🔐 Login attempt: {}", payload.username);
    let response = auth.login(payload).await?;
    Ok(Json(response))
}
