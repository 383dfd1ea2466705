use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api::{GenerateContentRequest, GenerateContentResponse};

/// POST /api/v1/generate-notebook-content — dispatch content generation and
/// wait for the worker's result.
pub async fn generate_notebook_content(
    State(state): State<AppState>,
    Json(req): Json<GenerateContentRequest>,
) -> Result<Json<GenerateContentResponse>, ApiError> {
    state
        .dispatcher
        .generate_notebook_content(req)
        .await
        .map(Json)
}
