use crate::api::extract::ApiJson;
use crate::error::ApiError;
use crate::feedback::FeedbackRequest;
use crate::server::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<FeedbackRequest>,
) -> Result<Json<Value>, ApiError> {
    state.feedback.submit(payload).await?;
    Ok(Json(json!({ "success": true })))
}
