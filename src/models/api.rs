//! Request and response bodies for the HTTP surface.
//!
//! Field casing follows the callers each endpoint serves: the browser-facing
//! dispatch endpoints use camelCase, the worker-facing callback and chat
//! relay use snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to dispatch notebook content generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub notebook_id: Option<Uuid>,
    pub file_path: Option<String>,
    pub source_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub success: bool,
    pub title: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
    pub example_questions: Vec<String>,
    pub message: String,
}

/// Request to dispatch audio overview generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioRequest {
    pub notebook_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GenerateAudioResponse {
    pub success: bool,
    pub message: String,
    pub status: String,
}

/// Completion notification posted back by the audio worker.
#[derive(Debug, Deserialize)]
pub struct AudioCallbackRequest {
    pub notebook_id: Option<Uuid>,
    pub audio_url: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Completion notification posted back by the document processing worker.
#[derive(Debug, Deserialize)]
pub struct DocumentCallbackRequest {
    pub source_id: Option<Uuid>,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// Acknowledgement returned for worker callbacks.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub success: bool,
}

/// Request to dispatch document processing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentRequest {
    pub source_id: Option<Uuid>,
    pub file_path: Option<String>,
    pub source_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessDocumentResponse {
    pub success: bool,
    pub message: String,
    pub result: serde_json::Value,
}

/// Request to relay additional sources (website lists or copied text)
/// to the ingestion worker.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalSourcesRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub notebook_id: Option<Uuid>,
    pub urls: Option<Vec<String>>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub timestamp: Option<String>,
    pub source_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalSourcesResponse {
    pub success: bool,
    pub message: String,
    pub webhook_response: String,
}

/// Chat message relayed synchronously to the chat worker.
#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageResponse {
    pub success: bool,
    pub data: serde_json::Value,
}
