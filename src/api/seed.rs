use crate::error::ApiError;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode};

/// POST /seed
pub async fn seed(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.seeder.seed_all()?;
    Ok(StatusCode::NO_CONTENT)
}
