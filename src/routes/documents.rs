use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api::{
    CallbackAck, DocumentCallbackRequest, ProcessDocumentRequest, ProcessDocumentResponse,
};

/// POST /api/v1/process-document — dispatch document processing. The worker
/// acknowledges synchronously and reports completion via the callback below.
pub async fn process_document(
    State(state): State<AppState>,
    Json(req): Json<ProcessDocumentRequest>,
) -> Result<Json<ProcessDocumentResponse>, ApiError> {
    state.dispatcher.process_document(req).await.map(Json)
}

/// POST /api/v1/process-document-callback — terminal transition posted by
/// the document processing worker.
pub async fn process_document_callback(
    State(state): State<AppState>,
    Json(req): Json<DocumentCallbackRequest>,
) -> Result<Json<CallbackAck>, ApiError> {
    state.callbacks.apply_document_callback(req).await.map(Json)
}
