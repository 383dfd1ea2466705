//! Notebook Relay
//!
//! Coordinates long-running, externally-executed notebook jobs (content
//! generation, audio synthesis, document processing, source ingestion, chat
//! relay). Dispatch records intent in the record store, hands work to an
//! external worker over a webhook call, and returns immediately; the worker
//! finalizes the job through an asynchronous callback.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use axum::{routing::get, routing::post, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use app_state::AppState;

/// Build the API router. The CORS layer answers browser preflight requests;
/// every endpoint speaks JSON.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/v1/generate-notebook-content",
            post(routes::generation::generate_notebook_content),
        )
        .route(
            "/api/v1/generate-audio-overview",
            post(routes::audio::generate_audio_overview),
        )
        .route(
            "/api/v1/audio-generation-callback",
            post(routes::audio::audio_generation_callback),
        )
        .route(
            "/api/v1/process-document",
            post(routes::documents::process_document),
        )
        .route(
            "/api/v1/process-document-callback",
            post(routes::documents::process_document_callback),
        )
        .route(
            "/api/v1/process-additional-sources",
            post(routes::sources::process_additional_sources),
        )
        .route(
            "/api/v1/send-chat-message",
            post(routes::chat::send_chat_message),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)) // 2 MB limit
}
