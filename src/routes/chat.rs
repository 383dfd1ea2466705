use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api::{ChatMessageRequest, ChatMessageResponse};

/// POST /api/v1/send-chat-message — synchronous relay to the chat worker;
/// the worker's JSON is passed through under `data`.
pub async fn send_chat_message(
    State(state): State<AppState>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    state.dispatcher.send_chat_message(req).await.map(Json)
}
