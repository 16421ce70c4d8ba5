use crate::destinations::Destination;
use crate::error::ApiError;
use crate::server::AppState;
use axum::{extract::State, Json};

/// GET /api/destinations
pub async fn list_destinations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Destination>>, ApiError> {
    Ok(Json(state.destinations.list_all()?))
}
