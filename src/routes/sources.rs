use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::AdditionalSourcesRequest;

/// POST /api/v1/process-additional-sources — relay website lists or copied
/// text to the ingestion worker. Every failure on this endpoint, validation
/// included, answers 500 with `success: false`; its browser clients branch
/// on the body, not the status.
pub async fn process_additional_sources(
    State(state): State<AppState>,
    Json(req): Json<AdditionalSourcesRequest>,
) -> Response {
    match state.dispatcher.process_additional_sources(req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            let body = serde_json::json!({
                "error": e.to_string(),
                "success": false,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
