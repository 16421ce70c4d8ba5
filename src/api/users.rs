//! Users endpoints (protected)

use crate::api::extract::ApiJson;
use crate::auth::models::{Claims, CreatedUserResponse, Credentials, UserPublicView};
use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserPublicView>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserPublicView,
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UsersResponse>, ApiError> {
    let users = state
        .auth
        .store()
        .list()?
        .iter()
        .map(|u| u.public_view())
        .collect();
    Ok(Json(UsersResponse { users }))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: i64 = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::validation("Invalid user ID"))?;

    state
        .auth
        .store()
        .find_by_id(id)?
        .map(|u| Json(UserResponse { user: u.public_view() }))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// POST /users/create
///
/// Claims are only present when the caller sent a valid bearer token.
pub async fn create_user(
    State(state): State<AppState>,
    requester: Option<Extension<Claims>>,
    ApiJson(payload): ApiJson<Credentials>,
) -> Result<(StatusCode, Json<CreatedUserResponse>), ApiError> {
    let user = state.auth.create_user(payload).await?;
    match requester {
        Some(Extension(claims)) => info!(
            "👤 User {} created by {} ({})",
            user.username, claims.username, claims.id
        ),
        None => info!("👤 User {} created by unverified caller", user.username),
    }
    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            message: "User created successfully",
            user,
        }),
    ))
}
