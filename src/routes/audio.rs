use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::api::{
    AudioCallbackRequest, CallbackAck, GenerateAudioRequest, GenerateAudioResponse,
};

/// POST /api/v1/generate-audio-overview — dispatch audio generation. Returns
/// immediately; completion arrives through the callback below.
pub async fn generate_audio_overview(
    State(state): State<AppState>,
    Json(req): Json<GenerateAudioRequest>,
) -> Result<Json<GenerateAudioResponse>, ApiError> {
    state
        .dispatcher
        .generate_audio_overview(req)
        .await
        .map(Json)
}

/// POST /api/v1/audio-generation-callback — terminal transition posted by
/// the audio worker.
pub async fn audio_generation_callback(
    State(state): State<AppState>,
    Json(req): Json<AudioCallbackRequest>,
) -> Result<Json<CallbackAck>, ApiError> {
    state.callbacks.apply_audio_callback(req).await.map(Json)
}
