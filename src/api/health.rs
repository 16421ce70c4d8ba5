//! Health endpoints

use crate::error::ApiError;
use crate::server::AppState;
use crate::timewarp::{HealthStatus, TimewarpRecord};
use axum::{extract::State, Json};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    let status = state
        .timewarp
        .check_connection()
        .map_err(|e| ApiError::internal_with(e, "Database check failed"))?;
    Ok(Json(status))
}

/// GET /health/timewarp
pub async fn timewarp_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimewarpRecord>>, ApiError> {
    Ok(Json(state.timewarp.all_records()?))
}
